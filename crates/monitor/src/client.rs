//! CT 로그 조회 클라이언트
//!
//! 로그 하나에 대한 조회 능력(트리 크기 조회, 엔트리 범위 조회)을
//! [`LogClient`] trait으로 추상화합니다. 탐색 단계는 [`LogClientFactory`]로
//! 로그 URL마다 클라이언트를 만듭니다.
//!
//! [`HttpLogClient`]는 RFC 6962 `get-sth` / `get-entries` 엔드포인트를 사용합니다.
//! `get-entries`의 `end`는 와이어 상에서 포함 구간이므로, 배타적 구간
//! `[start, end)`를 `start..=end-1`로 요청합니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use tracing::trace;

use crate::entry::{CertKind, CertPayload, RawEntry};
use crate::error::CtMonitorError;

/// 로그 하나에 대한 조회 능력
pub trait LogClient: Send + Sync + 'static {
    /// 로그 엔드포인트 URL
    fn url(&self) -> &str;

    /// 현재 트리 크기를 조회합니다.
    fn tree_size(&self) -> impl Future<Output = Result<u64, CtMonitorError>> + Send;

    /// `[start, end)` 구간의 엔트리를 순서대로 조회합니다.
    ///
    /// 서버는 요청보다 적은 수를 돌려줄 수 있습니다. 반환된 엔트리의 인덱스는
    /// `start`부터 연속입니다.
    fn entries(
        &self,
        start: u64,
        end: u64,
    ) -> impl Future<Output = Result<Vec<RawEntry>, CtMonitorError>> + Send;
}

/// 로그 URL로 조회 클라이언트를 생성하는 팩토리
pub trait LogClientFactory: Send + Sync + 'static {
    /// 생성되는 클라이언트 타입
    type Client: LogClient;

    /// 로그 URL에 대한 클라이언트를 생성합니다.
    fn connect(&self, url: &str) -> Result<Self::Client, CtMonitorError>;
}

#[derive(Debug, Deserialize)]
struct SthResponse {
    tree_size: u64,
}

#[derive(Debug, Deserialize)]
struct EntriesResponse {
    #[serde(default)]
    entries: Vec<WireEntry>,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    leaf_input: String,
    #[serde(default)]
    extra_data: String,
}

/// RFC 6962 HTTP 클라이언트
#[derive(Clone)]
pub struct HttpLogClient {
    url: Arc<str>,
    base: url::Url,
    client: reqwest::Client,
}

impl HttpLogClient {
    fn endpoint(&self, path: &str) -> Result<url::Url, CtMonitorError> {
        self.base.join(path).map_err(|e| CtMonitorError::Transport {
            log: self.url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: url::Url,
    ) -> Result<T, CtMonitorError> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CtMonitorError::Transport {
                log: self.url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport(e))?;
        serde_json::from_slice(&body).map_err(|e| CtMonitorError::Protocol {
            log: self.url.to_string(),
            reason: e.to_string(),
        })
    }

    fn transport(&self, err: reqwest::Error) -> CtMonitorError {
        CtMonitorError::Transport {
            log: self.url.to_string(),
            reason: err.to_string(),
        }
    }
}

impl LogClient for HttpLogClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn tree_size(&self) -> Result<u64, CtMonitorError> {
        let endpoint = self.endpoint("ct/v1/get-sth")?;
        let sth: SthResponse = self.get_json(endpoint).await?;
        Ok(sth.tree_size)
    }

    async fn entries(&self, start: u64, end: u64) -> Result<Vec<RawEntry>, CtMonitorError> {
        if end <= start {
            return Ok(Vec::new());
        }

        let mut endpoint = self.endpoint("ct/v1/get-entries")?;
        endpoint
            .query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("end", &(end - 1).to_string());

        let response: EntriesResponse = self.get_json(endpoint).await?;
        let requested = usize::try_from(end - start).unwrap_or(usize::MAX);

        Ok(response
            .entries
            .iter()
            .take(requested)
            .zip(start..)
            .map(|(wire, index)| decode_entry(&self.url, index, &wire.leaf_input, &wire.extra_data))
            .collect())
    }
}

/// HTTP 클라이언트 팩토리
///
/// 하나의 `reqwest::Client` 연결 풀을 모든 로그가 공유합니다.
#[derive(Clone)]
pub struct HttpClientFactory {
    client: reqwest::Client,
}

impl HttpClientFactory {
    /// 요청 타임아웃으로 팩토리를 생성합니다.
    ///
    /// HTTP 클라이언트를 만들 수 없으면(TLS 백엔드 초기화 실패 등) 에러를 반환합니다.
    pub fn new(timeout: Duration) -> Result<Self, CtMonitorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| CtMonitorError::Config {
                field: "http_client".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl LogClientFactory for HttpClientFactory {
    type Client = HttpLogClient;

    fn connect(&self, url: &str) -> Result<HttpLogClient, CtMonitorError> {
        // 상대 경로 join이 로그 경로를 유지하도록 끝에 '/'를 보장합니다.
        let normalized = if url.ends_with('/') {
            url.to_owned()
        } else {
            format!("{url}/")
        };

        let base = url::Url::parse(&normalized).map_err(|e| CtMonitorError::Transport {
            log: url.to_owned(),
            reason: format!("invalid log url: {e}"),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(CtMonitorError::Transport {
                log: url.to_owned(),
                reason: format!("unsupported scheme '{}'", base.scheme()),
            });
        }

        Ok(HttpLogClient {
            url: Arc::from(url),
            base,
            client: self.client.clone(),
        })
    }
}

// --- MerkleTreeLeaf 디코딩 ---

const LEAF_HEADER_LEN: usize = 12;
const ISSUER_KEY_HASH_LEN: usize = 32;

/// `get-entries` 응답 항목 하나를 [`RawEntry`]로 변환합니다.
///
/// 형식이 맞지 않으면 인증서 없는 엔트리가 됩니다.
pub(crate) fn decode_entry(log: &Arc<str>, index: u64, leaf_b64: &str, extra_b64: &str) -> RawEntry {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut entry = RawEntry::empty(Arc::clone(log), index);

    let Ok(leaf) = engine.decode(leaf_b64) else {
        trace!(log = %log, index, "leaf_input is not valid base64");
        return entry;
    };

    // version(1) | leaf_type(1) | timestamp(8) | entry_type(2)
    if leaf.len() < LEAF_HEADER_LEN || leaf[0] != 0 || leaf[1] != 0 {
        trace!(log = %log, index, "unsupported merkle tree leaf");
        return entry;
    }

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&leaf[2..10]);
    entry.timestamp_ms = Some(u64::from_be_bytes(ts));

    let body = &leaf[LEAF_HEADER_LEN..];
    entry.certificate = match u16::from_be_bytes([leaf[10], leaf[11]]) {
        0 => read_u24_prefixed(body).map(|der| CertPayload {
            kind: CertKind::X509,
            der: Bytes::copy_from_slice(der),
        }),
        1 if body.len() > ISSUER_KEY_HASH_LEN => {
            // 리프에는 TBSCertificate만 있으므로 extra_data의 pre_certificate를 사용합니다.
            engine.decode(extra_b64).ok().and_then(|extra| {
                read_u24_prefixed(&extra).map(|der| CertPayload {
                    kind: CertKind::Precertificate,
                    der: Bytes::copy_from_slice(der),
                })
            })
        }
        other => {
            trace!(log = %log, index, entry_type = other, "unknown log entry type");
            None
        }
    };

    entry
}

/// 24비트 big-endian 길이 접두사가 붙은 바이트열을 읽습니다.
fn read_u24_prefixed(buf: &[u8]) -> Option<&[u8]> {
    let len_bytes = buf.get(..3)?;
    let len = (usize::from(len_bytes[0]) << 16)
        | (usize::from(len_bytes[1]) << 8)
        | usize::from(len_bytes[2]);
    if len == 0 {
        return None;
    }
    buf.get(3..3 + len)
}

#[cfg(test)]
pub(crate) mod mock {
    //! 테스트용 인메모리 로그

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct MockState {
        tree_size: u64,
        certs: Vec<Option<Vec<u8>>>,
        fail_tree_size: bool,
        fail_entries: bool,
        max_batch: Option<u64>,
        entries_delay: Option<std::time::Duration>,
        requests: Vec<(u64, u64)>,
    }

    /// 크기와 실패를 조작할 수 있는 인메모리 로그
    #[derive(Clone)]
    pub(crate) struct MockLogClient {
        url: Arc<str>,
        state: Arc<Mutex<MockState>>,
    }

    impl MockLogClient {
        pub(crate) fn new(url: &str) -> Self {
            Self {
                url: Arc::from(url),
                state: Arc::default(),
            }
        }

        /// 인증서 없는 엔트리만으로 트리 크기를 설정합니다.
        pub(crate) fn set_tree_size(&self, size: u64) {
            self.state.lock().unwrap().tree_size = size;
        }

        /// 인증서 엔트리를 하나 추가하고 트리를 키웁니다.
        pub(crate) fn append_cert(&self, der: Vec<u8>) {
            let mut state = self.state.lock().unwrap();
            let index = state.tree_size as usize;
            if state.certs.len() < index {
                state.certs.resize(index, None);
            }
            state.certs.push(Some(der));
            state.tree_size += 1;
        }

        pub(crate) fn fail_tree_size(&self, fail: bool) {
            self.state.lock().unwrap().fail_tree_size = fail;
        }

        pub(crate) fn fail_entries(&self, fail: bool) {
            self.state.lock().unwrap().fail_entries = fail;
        }

        /// 한 번에 돌려주는 엔트리 수를 제한합니다.
        pub(crate) fn limit_batch(&self, max: u64) {
            self.state.lock().unwrap().max_batch = Some(max);
        }

        /// `get-entries` 응답을 지연시킵니다.
        pub(crate) fn delay_entries(&self, delay: std::time::Duration) {
            self.state.lock().unwrap().entries_delay = Some(delay);
        }

        pub(crate) fn requests(&self) -> Vec<(u64, u64)> {
            self.state.lock().unwrap().requests.clone()
        }
    }

    impl LogClient for MockLogClient {
        fn url(&self) -> &str {
            &self.url
        }

        async fn tree_size(&self) -> Result<u64, CtMonitorError> {
            let state = self.state.lock().unwrap();
            if state.fail_tree_size {
                return Err(CtMonitorError::Transport {
                    log: self.url.to_string(),
                    reason: "get-sth unavailable".to_owned(),
                });
            }
            Ok(state.tree_size)
        }

        async fn entries(&self, start: u64, end: u64) -> Result<Vec<RawEntry>, CtMonitorError> {
            let delay = self.state.lock().unwrap().entries_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.state.lock().unwrap();
            state.requests.push((start, end));
            if state.fail_entries {
                return Err(CtMonitorError::Transport {
                    log: self.url.to_string(),
                    reason: "get-entries unavailable".to_owned(),
                });
            }

            let end = end.min(state.tree_size);
            let end = state.max_batch.map_or(end, |max| end.min(start + max));
            Ok((start..end)
                .map(|index| match state.certs.get(index as usize).cloned().flatten() {
                    Some(der) => RawEntry::with_certificate(Arc::clone(&self.url), index, CertKind::X509, der),
                    None => RawEntry::empty(Arc::clone(&self.url), index),
                })
                .collect())
        }
    }

    /// URL → 모의 로그 매핑 팩토리. 등록되지 않은 URL은 연결에 실패합니다.
    #[derive(Clone, Default)]
    pub(crate) struct MockClientFactory {
        logs: Arc<Mutex<HashMap<String, MockLogClient>>>,
    }

    impl MockClientFactory {
        pub(crate) fn register(&self, client: MockLogClient) {
            self.logs
                .lock()
                .unwrap()
                .insert(client.url().to_owned(), client);
        }
    }

    impl LogClientFactory for MockClientFactory {
        type Client = MockLogClient;

        fn connect(&self, url: &str) -> Result<MockLogClient, CtMonitorError> {
            self.logs
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| CtMonitorError::Transport {
                    log: url.to_owned(),
                    reason: "connection refused".to_owned(),
                })
        }
    }
}
