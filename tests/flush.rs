mod integration {
    mod flush {
        extern crate firehose_influxdb;

        use self::firehose_influxdb::envelope::{Envelope, EventType};
        use self::firehose_influxdb::sink::{InfluxDB, InfluxDBConfig, Sink, SinkError};
        use self::firehose_influxdb::source::Event;
        use std::sync::mpsc::sync_channel;

        #[derive(Default)]
        struct Recorder {
            fail_first: usize,
            posts: Vec<String>,
        }

        impl Sink for Recorder {
            fn post(&mut self, _url: &str, body: &[u8]) -> Result<(), SinkError> {
                self.posts.push(String::from_utf8_lossy(body).into_owned());
                if self.fail_first > 0 {
                    self.fail_first -= 1;
                    Err(SinkError::Transport("connection refused".to_string()))
                } else {
                    Ok(())
                }
            }
        }

        fn config() -> InfluxDBConfig {
            InfluxDBConfig {
                prefix: "cf.".to_string(),
                deployment: "cf".to_string(),
                ip: "10.0.0.1".to_string(),
                ..Default::default()
            }
        }

        #[test]
        fn test_shutdown_flushes_window() {
            let (snd, rcv) = sync_channel(16);
            snd.send(Event::Envelope(
                Envelope::value_metric("router", "latency", 1.25)
                    .timestamp(7_500_000_000)
                    .origin_of("cf", "router", "3", "10.0.16.5"),
            )).unwrap();
            snd.send(Event::Envelope(Envelope::new("router", EventType::LogMessage)))
                .unwrap();
            snd.send(Event::Shutdown).unwrap();

            let mut influx = InfluxDB::new(config(), Recorder::default()).unwrap();
            influx.run(rcv);

            let posts = &influx.sink().posts;
            assert_eq!(posts.len(), 1);
            assert!(posts[0].contains(
                "cf.router.latency,deployment=cf,job=router,index=3,ip=10.0.16.5 value=1.25 7000000000\n"
            ));
            assert!(posts[0].contains("cf.totalMessagesReceived,ip=10.0.0.1,deployment=cf value=2 "));
            assert_eq!(influx.aggregator().total_metrics_sent(), 4);
            assert!(influx.aggregator().entries().is_empty());
        }

        #[test]
        fn test_failed_flush_retries_on_next_tick() {
            let (snd, rcv) = sync_channel(16);
            snd.send(Event::Envelope(Envelope::counter_event("uaa", "logins", 1, 41)))
                .unwrap();
            snd.send(Event::TimerFlush).unwrap();
            snd.send(Event::Envelope(Envelope::counter_event("uaa", "logins", 1, 42)))
                .unwrap();
            snd.send(Event::TimerFlush).unwrap();
            drop(snd);

            let recorder = Recorder {
                fail_first: 1,
                ..Default::default()
            };
            let mut influx = InfluxDB::new(config(), recorder).unwrap();
            influx.run(rcv);

            // failed tick, retried tick, and the flush on hang up
            let posts = &influx.sink().posts;
            assert_eq!(posts.len(), 3);
            assert!(posts[0].contains("cf.uaa.logins, value=41 0\n"));
            assert!(!posts[0].contains("value=42"));
            assert!(posts[1].contains("cf.uaa.logins, value=41 0\ncf.uaa.logins, value=42 0\n"));
            assert!(posts[1].contains("cf.totalMetricsSent,ip=10.0.0.1,deployment=cf value=0 "));
            assert_eq!(posts[2].lines().count(), 3);
            assert!(posts[2].contains("cf.totalMetricsSent,ip=10.0.0.1,deployment=cf value=4 "));
        }
    }

    mod end_to_end {
        extern crate firehose_influxdb;
        extern crate serde_json;

        use self::firehose_influxdb::envelope::Envelope;
        use self::firehose_influxdb::sink::{Http, InfluxDB, InfluxDBConfig};
        use self::firehose_influxdb::source::{Event, Source, Tcp, TcpConfig};
        use std::io::{BufRead, BufReader, Read, Write};
        use std::net::{TcpListener, TcpStream};
        use std::sync::mpsc::{channel, sync_channel, Sender};
        use std::thread;
        use std::time::Duration;

        // Answers every request with 204 and forwards the request line and
        // body.
        fn influx_stub(listener: TcpListener, bodies: Sender<(String, String)>) {
            for stream in listener.incoming() {
                let stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => return,
                };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_right().to_string();
                    if line.is_empty() {
                        break;
                    }
                    if line.to_lowercase().starts_with("content-length:") {
                        content_length = line[15..].trim().parse().unwrap();
                    }
                }
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).unwrap();
                let mut stream = stream;
                stream
                    .write_all(
                        b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    )
                    .unwrap();
                let sent = bodies.send((
                    request_line.trim_right().to_string(),
                    String::from_utf8(body).unwrap(),
                ));
                if sent.is_err() {
                    return;
                }
            }
        }

        #[test]
        fn test_tcp_to_influxdb() {
            let stub = TcpListener::bind("127.0.0.1:0").unwrap();
            let stub_addr = stub.local_addr().unwrap();
            let (body_snd, body_rcv) = channel();
            thread::spawn(move || influx_stub(stub, body_snd));

            let mut tcp = Tcp::new(&TcpConfig {
                port: 0,
                ..Default::default()
            }).unwrap();
            let tcp_addr = tcp.local_addr().unwrap();
            let (snd, rcv) = sync_channel(64);
            let tcp_snd = snd.clone();
            thread::spawn(move || tcp.run(tcp_snd));

            let config = InfluxDBConfig {
                url: format!("http://{}", stub_addr),
                db: "firehose".to_string(),
                prefix: "cf.".to_string(),
                deployment: "cf".to_string(),
                ip: "10.0.0.1".to_string(),
                ..Default::default()
            };
            let http = Http::new("", "", Duration::from_secs(5)).unwrap();
            let consumer = thread::spawn(move || {
                let mut influx = InfluxDB::new(config, http).unwrap();
                influx.run(rcv);
            });

            let envelope = Envelope::value_metric("router", "latency", 9.5)
                .timestamp(1_000_000_000_000)
                .origin_of("cf", "router", "0", "10.0.16.5");
            let mut client = TcpStream::connect(tcp_addr).unwrap();
            writeln!(client, "{}", serde_json::to_string(&envelope).unwrap()).unwrap();
            drop(client);

            let expected =
                "cf.router.latency,deployment=cf,job=router,index=0,ip=10.0.16.5 value=9.5 1000000000000\n";
            let mut found = false;
            for _ in 0..100 {
                snd.send(Event::TimerFlush).unwrap();
                let (request_line, body) = body_rcv.recv_timeout(Duration::from_secs(10)).unwrap();
                assert_eq!(request_line, "POST /write?db=firehose HTTP/1.1");
                if body.contains(expected) {
                    found = true;
                    break;
                }
                thread::sleep(Duration::from_millis(20));
            }
            assert!(found);

            snd.send(Event::Shutdown).unwrap();
            consumer.join().unwrap();
        }
    }
}
