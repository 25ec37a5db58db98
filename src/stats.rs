//! Typed views of the YAML statistics documents.
//!
//! Fields follow the server's kebab-case keys. Keys this crate doesn't know
//! are ignored and missing keys take their zero value, so newer or older
//! servers still decode.

use serde::Deserialize;

use crate::job::JobState;

/// Reply to `stats-job`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct JobStats {
    pub id: u64,
    pub tube: String,
    pub state: JobState,
    pub pri: u32,
    pub age: u64,
    pub delay: u64,
    pub ttr: u64,
    pub time_left: u64,
    pub file: u64,
    pub reserves: u64,
    pub timeouts: u64,
    pub releases: u64,
    pub buries: u64,
    pub kicks: u64,
}

impl Default for JobStats {
    fn default() -> Self {
        Self {
            id: 0,
            tube: String::new(),
            state: JobState::Ready,
            pri: 0,
            age: 0,
            delay: 0,
            ttr: 0,
            time_left: 0,
            file: 0,
            reserves: 0,
            timeouts: 0,
            releases: 0,
            buries: 0,
            kicks: 0,
        }
    }
}

/// Reply to `stats-tube`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TubeStats {
    pub name: String,
    pub current_jobs_urgent: u64,
    pub current_jobs_ready: u64,
    pub current_jobs_reserved: u64,
    pub current_jobs_delayed: u64,
    pub current_jobs_buried: u64,
    pub total_jobs: u64,
    pub current_using: u64,
    pub current_waiting: u64,
    pub current_watching: u64,
    pub pause: u64,
    pub cmd_delete: u64,
    pub cmd_pause_tube: u64,
    pub pause_time_left: u64,
}

/// Reply to `stats`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerStats {
    pub current_jobs_urgent: u64,
    pub current_jobs_ready: u64,
    pub current_jobs_reserved: u64,
    pub current_jobs_delayed: u64,
    pub current_jobs_buried: u64,
    pub cmd_put: u64,
    pub cmd_peek: u64,
    pub cmd_peek_ready: u64,
    pub cmd_peek_delayed: u64,
    pub cmd_peek_buried: u64,
    pub cmd_reserve: u64,
    pub cmd_reserve_with_timeout: u64,
    pub cmd_touch: u64,
    pub cmd_use: u64,
    pub cmd_watch: u64,
    pub cmd_ignore: u64,
    pub cmd_delete: u64,
    pub cmd_release: u64,
    pub cmd_bury: u64,
    pub cmd_kick: u64,
    pub cmd_stats: u64,
    pub cmd_stats_job: u64,
    pub cmd_stats_tube: u64,
    pub cmd_list_tubes: u64,
    pub cmd_list_tube_used: u64,
    pub cmd_list_tubes_watched: u64,
    pub cmd_pause_tube: u64,
    pub job_timeouts: u64,
    pub total_jobs: u64,
    pub max_job_size: u64,
    pub current_tubes: u64,
    pub current_connections: u64,
    pub current_producers: u64,
    pub current_workers: u64,
    pub current_waiting: u64,
    pub total_connections: u64,
    pub pid: u64,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    pub rusage_utime: f64,
    pub rusage_stime: f64,
    pub uptime: u64,
    pub binlog_oldest_index: u64,
    pub binlog_current_index: u64,
    pub binlog_records_migrated: u64,
    pub binlog_records_written: u64,
    pub binlog_max_size: u64,
    pub draining: bool,
    pub id: String,
    pub hostname: String,
    pub os: String,
    pub platform: String,
}

// `version: 1.12` arrives unquoted from some servers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Float(f64),
        Int(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Float(f) => f.to_string(),
        Raw::Int(i) => i.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_stats() {
        let yaml = "---\nid: 12\ntube: emails\nstate: reserved\npri: 1024\nage: 3\ndelay: 0\nttr: 60\ntime-left: 57\nfile: 0\nreserves: 1\ntimeouts: 0\nreleases: 0\nburies: 0\nkicks: 0\n";
        let stats: JobStats = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(stats.id, 12);
        assert_eq!(stats.tube, "emails");
        assert_eq!(stats.state, JobState::Reserved);
        assert_eq!(stats.time_left, 57);
    }

    #[test]
    fn test_tube_stats_ignores_unknown_keys() {
        let yaml = "---\nname: default\ncurrent-jobs-ready: 4\ntotal-jobs: 9\nsome-future-key: 1\n";
        let stats: TubeStats = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(stats.name, "default");
        assert_eq!(stats.current_jobs_ready, 4);
        assert_eq!(stats.total_jobs, 9);
        assert_eq!(stats.pause, 0);
    }

    #[test]
    fn test_server_stats_version_forms() {
        let quoted: ServerStats =
            serde_yaml::from_str("---\nversion: \"1.13\"\ndraining: false\nrusage-utime: 0.25\n").unwrap();
        assert_eq!(quoted.version, "1.13");
        assert_eq!(quoted.rusage_utime, 0.25);

        let bare: ServerStats = serde_yaml::from_str("---\nversion: 1.12\nhostname: q1\n").unwrap();
        assert_eq!(bare.version, "1.12");
        assert_eq!(bare.hostname, "q1");
    }
}
