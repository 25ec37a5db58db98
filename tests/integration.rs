//! Integration tests for beanstalk-client.
//!
//! Runs real clients against a small in-process server that speaks enough of
//! the protocol for producer/consumer flows.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use beanstalk_client::codec::MsgPackSerializer;
use beanstalk_client::{Client, JobState, PutOptions};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct Store {
    next_id: u64,
    ready: VecDeque<(u64, String, Vec<u8>)>,
    reserved: HashSet<u64>,
}

async fn serve(socket: TcpStream, store: Arc<Mutex<Store>>) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut used = "default".to_string();
    let mut watched = vec!["default".to_string()];

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let tokens: Vec<&str> = line.trim_end().split(' ').collect();

        let reply: Vec<u8> = match tokens.as_slice() {
            ["use", tube] => {
                used = tube.to_string();
                format!("USING {tube}\r\n").into_bytes()
            }
            ["put", _pri, _delay, _ttr, len] => {
                let len: usize = len.parse().unwrap();
                let mut body = vec![0u8; len + 2];
                reader.read_exact(&mut body).await.unwrap();
                body.truncate(len);

                let mut store = store.lock().unwrap();
                store.next_id += 1;
                let id = store.next_id;
                store.ready.push_back((id, used.clone(), body));
                format!("INSERTED {id}\r\n").into_bytes()
            }
            ["watch", tube] => {
                if !watched.iter().any(|t| t == tube) {
                    watched.push(tube.to_string());
                }
                format!("WATCHING {}\r\n", watched.len()).into_bytes()
            }
            ["ignore", tube] => {
                if watched.len() == 1 {
                    b"NOT_IGNORED\r\n".to_vec()
                } else {
                    watched.retain(|t| t != tube);
                    format!("WATCHING {}\r\n", watched.len()).into_bytes()
                }
            }
            ["reserve-with-timeout", _] => {
                let mut store = store.lock().unwrap();
                let position = store
                    .ready
                    .iter()
                    .position(|(_, tube, _)| watched.contains(tube));
                match position.and_then(|i| store.ready.remove(i)) {
                    Some((id, _, body)) => {
                        store.reserved.insert(id);
                        let mut reply = format!("RESERVED {id} {}\r\n", body.len()).into_bytes();
                        reply.extend_from_slice(&body);
                        reply.extend_from_slice(b"\r\n");
                        reply
                    }
                    None => b"TIMED_OUT\r\n".to_vec(),
                }
            }
            ["delete", id] => {
                let id: u64 = id.parse().unwrap();
                if store.lock().unwrap().reserved.remove(&id) {
                    b"DELETED\r\n".to_vec()
                } else {
                    b"NOT_FOUND\r\n".to_vec()
                }
            }
            ["list-tubes-watched"] => {
                let mut yaml = String::from("---\n");
                for tube in &watched {
                    yaml.push_str(&format!("- {tube}\n"));
                }
                format!("OK {}\r\n{}\r\n", yaml.len(), yaml).into_bytes()
            }
            _ => b"UNKNOWN_COMMAND\r\n".to_vec(),
        };

        if writer.write_all(&reply).await.is_err() {
            return;
        }
    }
}

async fn start_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let store = Arc::new(Mutex::new(Store::default()));

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, store.clone()));
        }
    });

    port
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
struct Email {
    to: String,
    subject: String,
}

/// Producer and consumer on separate connections, typed payloads.
#[tokio::test]
async fn test_producer_consumer_round_trip() {
    let port = start_server().await;

    let producer = Client::builder().port(port).build();
    producer.connect().await.unwrap();
    assert_eq!(producer.use_tube("emails").await.unwrap(), "emails");

    let email = Email {
        to: "ops@example.com".into(),
        subject: "disk 91% full".into(),
    };
    let payload = serde_json::to_value(&email).unwrap();
    let put = producer.put(&payload, PutOptions::new()).await.unwrap();
    assert_eq!(put.state, JobState::Ready);

    let consumer = Client::builder().port(port).build();
    consumer.connect().await.unwrap();

    // nothing in the default tube
    assert!(consumer.reserve_with_timeout(0).await.unwrap().is_none());

    assert_eq!(consumer.watch("emails").await.unwrap(), 2);
    assert!(consumer.ignore("default").await.unwrap());
    assert_eq!(consumer.list_tubes_watched().await.unwrap(), vec!["emails"]);
    assert!(!consumer.ignore("emails").await.unwrap());

    let job = consumer.reserve_with_timeout(0).await.unwrap().unwrap();
    assert_eq!(job.id, put.id);
    let received: Email = serde_json::from_value(job.payload).unwrap();
    assert_eq!(received, email);

    assert!(consumer.delete(job.id).await.unwrap());
    assert!(!consumer.delete(job.id).await.unwrap());

    producer.disconnect(false).await.unwrap();
    consumer.disconnect(false).await.unwrap();
}

/// Many tasks share one client; every job is accounted for exactly once.
#[tokio::test]
async fn test_shared_client_from_many_tasks() {
    let port = start_server().await;
    let client = Arc::new(Client::builder().port(port).build());
    client.connect().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            client
                .put(&serde_json::json!({ "n": i }), PutOptions::new())
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()));
    }
    assert_eq!(ids.len(), 20);

    let mut seen = HashSet::new();
    while let Some(job) = client.reserve_with_timeout(0).await.unwrap() {
        assert!(ids.contains(&job.id));
        seen.insert(job.payload["n"].as_u64().unwrap());
        assert!(client.delete(job.id).await.unwrap());
    }
    assert_eq!(seen, (0..20).collect::<HashSet<u64>>());
    assert!(!client.is_working());

    client.disconnect(false).await.unwrap();
}

/// MessagePack payloads survive the wire untouched.
#[tokio::test]
async fn test_msgpack_serializer_end_to_end() {
    let port = start_server().await;
    let client = Client::builder()
        .port(port)
        .serializer(MsgPackSerializer::<Email>::new())
        .build();
    client.connect().await.unwrap();

    let email = Email {
        to: "a@b.c".into(),
        subject: "\r\n in the subject".into(),
    };
    client.put(&email, PutOptions::new()).await.unwrap();

    let job = client.reserve_with_timeout(0).await.unwrap().unwrap();
    assert_eq!(job.payload, email);

    client.disconnect(true).await.unwrap();
    assert!(!client.is_connected());
}

/// A client can reconnect after a clean disconnect.
#[tokio::test]
async fn test_reconnect() {
    let port = start_server().await;
    let client = Client::builder().port(port).build();

    for _ in 0..2 {
        client.connect().await.unwrap();
        assert_eq!(client.use_tube("default").await.unwrap(), "default");
        client.disconnect(false).await.unwrap();
    }
}
