use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::COOKIE;
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;

use super::model::Assessor;
use crate::config::ArchiveConfig;
use crate::error::ArchiveError;

/// Processing-assessor type listed by the archive.
const ASSESSOR_XSI_TYPE: &str = "proc:genProcData";
const ASSESSOR_COLUMNS: &str = "ID,label,project,subject_label,session_label";

/// Operations the cleanup pipeline needs from the imaging archive.
pub trait ArchiveClient {
    fn list_project_assessors(&self, project: &str) -> Result<Vec<Assessor>, ArchiveError>;

    fn assessor_exists(&self, assessor: &Assessor) -> Result<bool, ArchiveError>;

    /// Delete the assessor and its files.
    fn delete_assessor(&self, assessor: &Assessor) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// XNAT REST session
// ---------------------------------------------------------------------------

/// An authenticated archive session. The server-side session is closed when
/// this value is dropped.
pub struct XnatSession {
    base: Url,
    client: Client,
    session_id: Option<String>,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct ResultSetEnvelope {
    #[serde(rename = "ResultSet")]
    result_set: ResultSet,
}

#[derive(Deserialize)]
struct ResultSet {
    #[serde(rename = "Result")]
    result: Vec<Assessor>,
}

impl XnatSession {
    /// Authenticate with basic auth and keep the returned session id.
    pub fn connect(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let base = Url::parse(config.host.trim_end_matches('/'))
            .map_err(|e| ArchiveError::Http(format!("invalid host '{}': {e}", config.host)))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ArchiveError::Http(e.to_string()))?;

        let mut session = Self {
            base,
            client,
            session_id: None,
            timeout_secs: config.timeout.as_secs(),
        };

        let url = session.url(&["data", "JSESSION"])?;
        let response = session
            .client
            .post(url)
            .basic_auth(&config.user, Some(&config.password))
            .send()
            .map_err(|e| session.transport_error(e))?;
        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ArchiveError::Auth(config.user.clone()));
        }
        let response = check_status(response)?;
        let id = response
            .text()
            .map_err(|e| ArchiveError::ResponseParsing(e.to_string()))?
            .trim()
            .to_string();
        if id.is_empty() {
            return Err(ArchiveError::ResponseParsing("empty session id".into()));
        }
        log::debug!("Archive session opened on {}", session.base);
        session.session_id = Some(id);
        Ok(session)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ArchiveError> {
        build_url(&self.base, segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.session_id {
            Some(id) => builder.header(COOKIE, format!("JSESSIONID={id}")),
            None => builder,
        }
    }

    fn send(&self, builder: RequestBuilder) -> Result<Response, ArchiveError> {
        builder.send().map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> ArchiveError {
        if e.is_timeout() {
            ArchiveError::Timeout(format!("no answer after {}s", self.timeout_secs))
        } else {
            ArchiveError::Http(e.to_string())
        }
    }
}

impl ArchiveClient for XnatSession {
    fn list_project_assessors(&self, project: &str) -> Result<Vec<Assessor>, ArchiveError> {
        let mut url = self.url(&["data", "projects", project, "experiments"])?;
        url.query_pairs_mut()
            .append_pair("xsiType", ASSESSOR_XSI_TYPE)
            .append_pair("columns", ASSESSOR_COLUMNS)
            .append_pair("format", "json");

        let response = check_status(self.send(self.request(Method::GET, url))?)?;
        let body = response
            .text()
            .map_err(|e| ArchiveError::ResponseParsing(e.to_string()))?;
        parse_assessor_listing(&body)
    }

    fn assessor_exists(&self, assessor: &Assessor) -> Result<bool, ArchiveError> {
        let mut url = self.url(&assessor_path(assessor))?;
        url.query_pairs_mut().append_pair("format", "json");
        let response = self.send(self.request(Method::GET, url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response)?;
        Ok(true)
    }

    fn delete_assessor(&self, assessor: &Assessor) -> Result<(), ArchiveError> {
        let mut url = self.url(&assessor_path(assessor))?;
        url.query_pairs_mut().append_pair("removeFiles", "true");
        let response = self.send(self.request(Method::DELETE, url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ArchiveError::NotFound(assessor.label.clone()));
        }
        check_status(response)?;
        Ok(())
    }
}

impl Drop for XnatSession {
    fn drop(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        let Ok(url) = self.url(&["data", "JSESSION"]) else {
            return;
        };
        let result = self
            .client
            .delete(url)
            .header(COOKIE, format!("JSESSIONID={id}"))
            .send();
        match result {
            Ok(_) => log::debug!("Archive session closed"),
            Err(e) => log::warn!("Could not close archive session: {e}"),
        }
    }
}

fn assessor_path(a: &Assessor) -> [&str; 9] {
    [
        "data",
        "projects",
        &a.project_id,
        "subjects",
        &a.subject_label,
        "experiments",
        &a.session_label,
        "assessors",
        &a.label,
    ]
}

/// Append percent-encoded path segments to `base`.
fn build_url(base: &Url, segments: &[&str]) -> Result<Url, ArchiveError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ArchiveError::Http(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn check_status(response: Response) -> Result<Response, ArchiveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(ArchiveError::Auth(response.url().to_string()));
    }
    if matches!(status, StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT) {
        return Err(ArchiveError::Timeout(format!("{status} from {}", response.url())));
    }
    let body = response.text().unwrap_or_default();
    Err(ArchiveError::Status {
        status: status.as_u16(),
        body,
    })
}

fn parse_assessor_listing(body: &str) -> Result<Vec<Assessor>, ArchiveError> {
    let envelope: ResultSetEnvelope =
        serde_json::from_str(body).map_err(|e| ArchiveError::ResponseParsing(e.to_string()))?;
    Ok(envelope.result_set.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    /// Answer one connection per scripted `(status, body)` and return the
    /// lowercased request heads in arrival order.
    fn stub_server(script: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut heads = Vec::new();
            for (status, body) in script {
                let (mut stream, _) = listener.accept().unwrap();
                heads.push(read_head(&mut stream));
                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
            heads
        });
        (host, handle)
    }

    fn read_head(stream: &mut impl Read) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                return String::from_utf8_lossy(&buf).to_lowercase();
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let mut have = buf.len() - end - 4;
            while have < body_len {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                have += n;
            }
            return head;
        }
    }

    fn config(host: String) -> ArchiveConfig {
        ArchiveConfig {
            host,
            user: "admin".into(),
            password: "secret".into(),
            timeout: Duration::from_secs(5),
        }
    }

    fn assessor() -> Assessor {
        Assessor::new("P", "S1", "E1", "P-x-S1-x-E1-x-FS")
    }

    #[test]
    fn existence_check_and_session_release() {
        let (host, server) = stub_server(vec![
            (200, "ABC123\n"),
            (404, ""),
            (200, "{}"),
            (200, ""),
        ]);
        let session = XnatSession::connect(&config(host)).unwrap();
        assert!(!session.assessor_exists(&assessor()).unwrap());
        assert!(session.assessor_exists(&assessor()).unwrap());
        drop(session);

        let heads = server.join().unwrap();
        assert_eq!(heads.len(), 4);
        assert!(heads[0].starts_with("post /data/jsession"));
        assert!(heads[0].contains("authorization: basic"));
        assert!(heads[1].starts_with(
            "get /data/projects/p/subjects/s1/experiments/e1/assessors/p-x-s1-x-e1-x-fs?format=json"
        ));
        assert!(heads[1].contains("jsessionid=abc123"));
        assert!(heads[3].starts_with("delete /data/jsession"));
        assert!(heads[3].contains("jsessionid=abc123"));
    }

    #[test]
    fn gateway_and_request_timeouts_are_transient() {
        let (host, server) = stub_server(vec![
            (200, "ABC123"),
            (504, ""),
            (408, ""),
            (401, ""),
            (500, "boom"),
            (200, ""),
        ]);
        let session = XnatSession::connect(&config(host)).unwrap();

        let err = session.assessor_exists(&assessor()).unwrap_err();
        assert!(matches!(err, ArchiveError::Timeout(_)));
        assert!(err.is_transient());
        assert!(matches!(
            session.assessor_exists(&assessor()),
            Err(ArchiveError::Timeout(_))
        ));
        assert!(matches!(
            session.delete_assessor(&assessor()),
            Err(ArchiveError::Auth(_))
        ));
        match session.delete_assessor(&assessor()) {
            Err(ArchiveError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
        drop(session);

        let heads = server.join().unwrap();
        assert!(heads[3].starts_with("delete /data/projects/p/"));
        assert!(heads[3].contains("removefiles=true"));
        assert!(heads[5].starts_with("delete /data/jsession"));
    }

    #[test]
    fn rejected_credentials_are_an_auth_error() {
        let (host, server) = stub_server(vec![(401, "")]);
        let err = XnatSession::connect(&config(host)).err().unwrap();
        assert!(matches!(err, ArchiveError::Auth(user) if user == "admin"));
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn listing_goes_through_project_experiments() {
        let body = r#"{"ResultSet":{"Result":[{"project":"P","subject_label":"S1","session_label":"E1","label":"P-x-S1-x-E1-x-FS"}]}}"#;
        let (host, server) = stub_server(vec![(200, "ABC123"), (200, body), (200, "")]);
        let session = XnatSession::connect(&config(host)).unwrap();
        assert_eq!(session.list_project_assessors("P").unwrap(), vec![assessor()]);
        drop(session);

        let heads = server.join().unwrap();
        assert!(heads[1].starts_with("get /data/projects/p/experiments?xsitype=proc%3agenprocdata"));
    }

    #[test]
    fn assessor_url_is_segment_encoded() {
        let base = Url::parse("https://xnat.example.org/").unwrap();
        let a = Assessor::new("P", "S 1", "E1", "P-x-S 1-x-E1-x-FS");
        let url = build_url(&base, &assessor_path(&a)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://xnat.example.org/data/projects/P/subjects/S%201/experiments/E1/assessors/P-x-S%201-x-E1-x-FS"
        );
    }

    #[test]
    fn base_with_path_prefix_is_kept() {
        let base = Url::parse("https://host/xnat").unwrap();
        let url = build_url(&base, &["data", "JSESSION"]).unwrap();
        assert_eq!(url.as_str(), "https://host/xnat/data/JSESSION");
    }

    #[test]
    fn listing_parses_result_set() {
        let body = r#"{"ResultSet":{"Result":[
            {"ID":"X1","project":"P","subject_label":"S1","session_label":"E1","label":"P-x-S1-x-E1-x-FS"}
        ],"totalRecords":"1"}}"#;
        let assessors = parse_assessor_listing(body).unwrap();
        assert_eq!(assessors, vec![Assessor::new("P", "S1", "E1", "P-x-S1-x-E1-x-FS")]);
    }

    #[test]
    fn garbage_listing_is_a_parse_error() {
        assert!(matches!(
            parse_assessor_listing("<html>"),
            Err(ArchiveError::ResponseParsing(_))
        ));
    }
}
