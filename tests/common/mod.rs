//! Shared test support: runtime setup, a fake connection factory, and a
//! small raw-socket HTTP client.

#![allow(dead_code)]

pub mod runtime {
    use std::sync::Once;

    /// Ensures the may scheduler is configured only once per test binary.
    static MAY_INIT: Once = Once::new();

    pub fn setup() {
        MAY_INIT.call_once(|| {
            // Enough workers that tests which deliberately block a few of
            // them (pool waits, simulated DB work) cannot starve the rest.
            may::config().set_workers(8).set_stack_size(0x10000);
        });
    }
}

pub mod fake_db {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tunedeck::pool::ConnectionFactory;

    /// An in-memory stand-in for an external connection.
    #[derive(Debug)]
    pub struct FakeConn {
        pub serial: usize,
    }

    /// Factory whose failure modes are driven by test code.
    pub struct FakeDbFactory {
        pub connects: AtomicUsize,
        pub fail_connect: AtomicBool,
        pub valid: AtomicBool,
    }

    impl FakeDbFactory {
        pub fn new() -> Self {
            FakeDbFactory {
                connects: AtomicUsize::new(0),
                fail_connect: AtomicBool::new(false),
                valid: AtomicBool::new(true),
            }
        }
    }

    impl ConnectionFactory for FakeDbFactory {
        type Conn = FakeConn;

        fn connect(&self) -> anyhow::Result<FakeConn> {
            if self.fail_connect.load(Ordering::SeqCst) {
                anyhow::bail!("fake backend refused the connection");
            }
            Ok(FakeConn {
                serial: self.connects.fetch_add(1, Ordering::SeqCst),
            })
        }

        fn is_valid(&self, _conn: &mut FakeConn) -> bool {
            self.valid.load(Ordering::SeqCst)
        }
    }
}

pub mod http {
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{SocketAddr, TcpStream};

    /// A response as read off the wire.
    #[derive(Debug)]
    pub struct RawResponse {
        pub status: u16,
        pub headers: HashMap<String, String>,
        pub body: String,
    }

    /// A plain std-socket client, usable for multiple requests on one
    /// keep-alive connection.
    pub struct TestClient {
        reader: BufReader<TcpStream>,
    }

    impl TestClient {
        pub fn connect(addr: SocketAddr) -> std::io::Result<Self> {
            let stream = TcpStream::connect(addr)?;
            Ok(TestClient {
                reader: BufReader::new(stream),
            })
        }

        /// Write one raw request and read one framed response.
        pub fn send(&mut self, raw: &str) -> std::io::Result<RawResponse> {
            self.reader.get_mut().write_all(raw.as_bytes())?;
            self.read_response()
        }

        /// Read a status line, headers, and a `Content-Length` body.
        pub fn read_response(&mut self) -> std::io::Result<RawResponse> {
            let mut status_line = String::new();
            self.reader.read_line(&mut status_line)?;
            let status: u16 = status_line
                .split_whitespace()
                .nth(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("bad status line: {status_line:?}"),
                    )
                })?;

            let mut headers = HashMap::new();
            loop {
                let mut line = String::new();
                self.reader.read_line(&mut line)?;
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
                }
            }

            let len: usize = headers
                .get("content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            let mut body = vec![0u8; len];
            self.reader.read_exact(&mut body)?;

            Ok(RawResponse {
                status,
                headers,
                body: String::from_utf8_lossy(&body).to_string(),
            })
        }

        /// Whether the server has closed the connection (EOF on read).
        pub fn at_eof(&mut self) -> bool {
            let mut byte = [0u8; 1];
            matches!(self.reader.read(&mut byte), Ok(0))
        }
    }

    /// One-shot request on a fresh connection.
    pub fn send_request(addr: SocketAddr, raw: &str) -> std::io::Result<RawResponse> {
        TestClient::connect(addr)?.send(raw)
    }

    /// Convenience builder for a minimal GET.
    pub fn get(path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: test\r\n\r\n")
    }
}
