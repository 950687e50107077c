//! 인증서 디코딩
//!
//! DER 바이트에서 룰 매칭과 결과 출력에 필요한 속성만 추출합니다.

use chrono::{DateTime, Utc};
use serde::Serialize;
use x509_parser::prelude::*;

use crate::error::CtMonitorError;

/// 디코딩된 인증서 속성
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedCertificate {
    /// Subject Common Name
    pub subject_cn: Option<String>,
    /// Subject Alternative Names (DNS 이름만)
    pub sans: Vec<String>,
    /// Issuer Common Name
    pub issuer_cn: Option<String>,
    /// 유효 시작 시각
    pub not_before: Option<DateTime<Utc>>,
    /// 유효 종료 시각
    pub not_after: Option<DateTime<Utc>>,
    /// 일련번호 (16진수)
    pub serial_hex: String,
    /// 원본 DER (base64로 직렬화)
    #[serde(serialize_with = "serialize_der")]
    pub der: Vec<u8>,
}

impl DecodedCertificate {
    /// DER 인코딩 인증서를 디코딩합니다.
    pub fn from_der(der: &[u8]) -> Result<Self, CtMonitorError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| CtMonitorError::Decode(e.to_string()))?;

        let subject_cn = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_owned);

        let issuer_cn = cert
            .issuer()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(str::to_owned);

        let mut sans = Vec::new();
        if let Ok(Some(ext)) = cert.subject_alternative_name() {
            for name in &ext.value.general_names {
                if let GeneralName::DNSName(dns) = name {
                    sans.push((*dns).to_owned());
                }
            }
        }

        let validity = cert.validity();
        let not_before = DateTime::<Utc>::from_timestamp(validity.not_before.timestamp(), 0);
        let not_after = DateTime::<Utc>::from_timestamp(validity.not_after.timestamp(), 0);

        Ok(Self {
            subject_cn,
            sans,
            issuer_cn,
            not_before,
            not_after,
            serial_hex: cert.raw_serial_as_string().replace(':', ""),
            der: der.to_vec(),
        })
    }

    /// 룰 매칭 후보 문자열 (CN 먼저, 이어서 선택적으로 SAN)
    pub fn match_candidates(&self, include_sans: bool) -> Vec<&str> {
        let mut candidates: Vec<&str> = self.subject_cn.as_deref().into_iter().collect();
        if include_sans {
            candidates.extend(self.sans.iter().map(String::as_str));
        }
        candidates
    }
}

fn serialize_der<S>(der: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use base64::Engine;
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(der))
}
