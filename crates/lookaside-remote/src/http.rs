use crate::{RemoteBackend, RemoteConfig, RemoteError};
use lookaside_core::FileRecord;
use std::io::Write;

/// HTTP-based lookaside store.
///
/// Artifacts are addressed by name, algorithm, and digest:
/// - `GET  /<name>/<algorithm>/<digest>/<name>`: download artifact
/// - `HEAD /<name>/<algorithm>/<digest>/<name>`: check existence
///
/// `<name>` is the final path component of the record's filename.
pub struct HttpBackend {
    config: RemoteConfig,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(config: RemoteConfig) -> Self {
        let agent = ureq::Agent::new_with_defaults();
        Self { config, agent }
    }

    pub fn artifact_url(&self, record: &FileRecord) -> Result<String, RemoteError> {
        let name = record
            .filename
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RemoteError::InvalidRecord(record.filename.display().to_string()))?;
        Ok(format!(
            "{}/{name}/{}/{}/{name}",
            self.config.url, record.algorithm, record.digest
        ))
    }

    fn do_get(&self, url: &str, dest: &mut dyn Write) -> Result<u64, RemoteError> {
        let mut req = self
            .agent
            .get(url)
            .header("X-Lookaside-Protocol", &crate::PROTOCOL_VERSION.to_string());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };

        let code = resp.status().as_u16();
        if code == 404 {
            return Err(RemoteError::NotFound(url.to_owned()));
        }
        if code >= 400 {
            return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
        }

        let mut reader = resp.into_body().into_reader();
        let written = std::io::copy(&mut reader, dest)?;
        Ok(written)
    }

    fn do_head(&self, url: &str) -> Result<u16, RemoteError> {
        let mut req = self
            .agent
            .head(url)
            .header("X-Lookaside-Protocol", &crate::PROTOCOL_VERSION.to_string());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.call() {
            Ok(resp) => Ok(resp.status().into()),
            Err(ureq::Error::StatusCode(code)) => Ok(code),
            Err(e) => Err(RemoteError::Http(e.to_string())),
        }
    }
}

impl RemoteBackend for HttpBackend {
    fn fetch(&self, record: &FileRecord, dest: &mut dyn Write) -> Result<u64, RemoteError> {
        let url = self.artifact_url(record)?;
        tracing::debug!("GET {url}");
        self.do_get(&url, dest)
    }

    fn has(&self, record: &FileRecord) -> Result<bool, RemoteError> {
        let url = self.artifact_url(record)?;
        tracing::debug!("HEAD {url}");
        match self.do_head(&url)? {
            200 => Ok(true),
            404 => Ok(false),
            code => Err(RemoteError::Http(format!("HTTP {code} for HEAD {url}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};

    /// A captured HTTP request for header inspection.
    #[derive(Debug, Clone)]
    struct CapturedRequest {
        method: String,
        path: String,
        headers: HashMap<String, String>,
    }

    /// Read-only lookaside server serving a fixed set of paths.
    struct MockServer {
        addr: String,
        _handle: std::thread::JoinHandle<()>,
        requests: Arc<Mutex<Vec<CapturedRequest>>>,
    }

    impl MockServer {
        fn start(files: HashMap<String, Vec<u8>>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = format!("http://{}", listener.local_addr().unwrap());
            let store = Arc::new(files);
            let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));

            let requests_clone = Arc::clone(&requests);
            let handle = std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let store = Arc::clone(&store);
                    let reqs = Arc::clone(&requests_clone);

                    std::thread::spawn(move || {
                        let mut reader = BufReader::new(stream.try_clone().unwrap());
                        let mut request_line = String::new();
                        if reader.read_line(&mut request_line).is_err() {
                            return;
                        }
                        let parts: Vec<&str> = request_line.trim().splitn(3, ' ').collect();
                        if parts.len() < 2 {
                            return;
                        }
                        let method = parts[0].to_owned();
                        let path = parts[1].to_owned();

                        let mut headers = HashMap::new();
                        loop {
                            let mut line = String::new();
                            if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                                break;
                            }
                            if let Some((k, v)) = line.trim().split_once(": ") {
                                headers.insert(k.to_lowercase(), v.to_owned());
                            }
                        }

                        reqs.lock().unwrap().push(CapturedRequest {
                            method: method.clone(),
                            path: path.clone(),
                            headers,
                        });

                        let not_found =
                            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
                        match (method.as_str(), store.get(&path)) {
                            ("GET", Some(body)) => {
                                let head = format!(
                                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                                    body.len()
                                );
                                let _ = stream.write_all(head.as_bytes());
                                let _ = stream.write_all(body);
                            }
                            ("HEAD", Some(_)) => {
                                let _ = stream.write_all(
                                    b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                                );
                            }
                            _ => {
                                let _ = stream.write_all(not_found.as_bytes());
                            }
                        }
                        let _ = stream.flush();
                    });
                }
            });

            MockServer {
                addr,
                _handle: handle,
                requests,
            }
        }

        fn captured_requests(&self) -> Vec<CapturedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn sample_record() -> FileRecord {
        FileRecord::new(
            "sources/payload.tar.gz",
            11,
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed",
            "sha1",
        )
    }

    fn served(body: &[u8]) -> HashMap<String, Vec<u8>> {
        let mut files = HashMap::new();
        files.insert(
            "/payload.tar.gz/sha1/2aae6c35c94fcfb415dbe95f408b9ce91ee846ed/payload.tar.gz"
                .to_owned(),
            body.to_vec(),
        );
        files
    }

    #[test]
    fn artifact_url_layout() {
        let backend = HttpBackend::new(RemoteConfig::new("https://cache.example.org/pkgs/"));
        assert_eq!(
            backend.artifact_url(&sample_record()).unwrap(),
            "https://cache.example.org/pkgs/payload.tar.gz/sha1/2aae6c35c94fcfb415dbe95f408b9ce91ee846ed/payload.tar.gz"
        );
    }

    #[test]
    fn artifact_url_requires_file_name() {
        let backend = HttpBackend::new(RemoteConfig::new("https://cache.example.org"));
        let record = FileRecord::new("..", 0, "00", "sha1");
        assert!(matches!(
            backend.artifact_url(&record),
            Err(RemoteError::InvalidRecord(_))
        ));
    }

    #[test]
    fn http_fetch_streams_body() {
        let server = MockServer::start(served(b"hello world"));
        let backend = HttpBackend::new(RemoteConfig::new(&server.addr));
        let mut out = Vec::new();
        let n = backend.fetch(&sample_record(), &mut out).unwrap();
        assert_eq!(n, 11);
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn http_fetch_missing_is_not_found() {
        let server = MockServer::start(HashMap::new());
        let backend = HttpBackend::new(RemoteConfig::new(&server.addr));
        let mut out = Vec::new();
        assert!(matches!(
            backend.fetch(&sample_record(), &mut out),
            Err(RemoteError::NotFound(_))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn http_has_true_and_false() {
        let server = MockServer::start(served(b"hello world"));
        let backend = HttpBackend::new(RemoteConfig::new(&server.addr));
        assert!(backend.has(&sample_record()).unwrap());
        let mut other = sample_record();
        other.digest = "0".repeat(40);
        assert!(!backend.has(&other).unwrap());
    }

    #[test]
    fn http_sends_protocol_header() {
        let server = MockServer::start(served(b"hello world"));
        let backend = HttpBackend::new(RemoteConfig::new(&server.addr));
        let mut out = Vec::new();
        backend.fetch(&sample_record(), &mut out).unwrap();

        let reqs = server.captured_requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].method, "GET");
        assert!(reqs[0].path.ends_with("/payload.tar.gz"));
        assert_eq!(
            reqs[0].headers.get("x-lookaside-protocol").map(String::as_str),
            Some("1")
        );
        assert!(!reqs[0].headers.contains_key("authorization"));
    }

    #[test]
    fn http_sends_auth_header() {
        let server = MockServer::start(served(b"hello world"));
        let backend = HttpBackend::new(RemoteConfig::new(&server.addr).with_token("tok-42"));
        assert!(backend.has(&sample_record()).unwrap());

        let reqs = server.captured_requests();
        assert_eq!(reqs[0].method, "HEAD");
        assert_eq!(
            reqs[0].headers.get("authorization").map(String::as_str),
            Some("Bearer tok-42")
        );
    }
}
