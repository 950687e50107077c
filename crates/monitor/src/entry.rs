//! 로그 엔트리 타입
//!
//! [`RawEntry`]는 폴링 루프가 로그에서 읽은 엔트리 하나입니다.
//! 인증서 본문은 아직 디코딩되지 않은 DER 바이트로만 들고 다니며,
//! 디코딩은 필터 워커에서 수행합니다.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

/// 엔트리가 담고 있는 인증서 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CertKind {
    /// 최종 발급된 X.509 인증서
    X509,
    /// 사전 인증서 (poison 확장 포함)
    Precertificate,
}

impl fmt::Display for CertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X509 => write!(f, "x509"),
            Self::Precertificate => write!(f, "precertificate"),
        }
    }
}

/// 엔트리에 포함된 인증서 DER 본문
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPayload {
    /// 인증서 종류
    pub kind: CertKind,
    /// DER 인코딩 바이트
    pub der: Bytes,
}

/// 로그에서 읽은 원시 엔트리
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// 엔트리를 읽은 로그 URL
    pub log: Arc<str>,
    /// 로그 내 인덱스
    pub index: u64,
    /// 리프의 타임스탬프 (epoch 밀리초)
    pub timestamp_ms: Option<u64>,
    /// 인증서 본문 (없거나 해석할 수 없으면 `None`)
    pub certificate: Option<CertPayload>,
}

impl RawEntry {
    /// 인증서 없는 엔트리를 생성합니다.
    pub fn empty(log: Arc<str>, index: u64) -> Self {
        Self {
            log,
            index,
            timestamp_ms: None,
            certificate: None,
        }
    }

    /// 인증서를 포함한 엔트리를 생성합니다.
    pub fn with_certificate(log: Arc<str>, index: u64, kind: CertKind, der: impl Into<Bytes>) -> Self {
        Self {
            log,
            index,
            timestamp_ms: None,
            certificate: Some(CertPayload {
                kind,
                der: der.into(),
            }),
        }
    }

    /// 인증서 본문 포함 여부
    pub fn has_certificate(&self) -> bool {
        self.certificate.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let log: Arc<str> = Arc::from("https://log.example/");
        let empty = RawEntry::empty(Arc::clone(&log), 7);
        assert!(!empty.has_certificate());
        assert_eq!(empty.index, 7);

        let full = RawEntry::with_certificate(log, 8, CertKind::Precertificate, vec![1u8, 2, 3]);
        let payload = full.certificate.unwrap();
        assert_eq!(payload.kind, CertKind::Precertificate);
        assert_eq!(&payload.der[..], &[1, 2, 3]);
    }

    #[test]
    fn cert_kind_display() {
        assert_eq!(CertKind::X509.to_string(), "x509");
        assert_eq!(CertKind::Precertificate.to_string(), "precertificate");
    }
}
