use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

/// Expiry state of one imported certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertState {
    Valid { days_left: i64 },
    /// Expires within the configured threshold.
    Expiring { days_left: i64 },
    Expired,
    Unparseable(String),
    /// Nothing imported for this slot.
    Missing,
}

impl CertState {
    pub fn is_ok(&self) -> bool {
        matches!(self, CertState::Valid { .. } | CertState::Missing)
    }
}

/// Reads `notAfter` from a PEM (or bare DER) encoded certificate.
pub fn parse_not_after(bundle: &[u8]) -> Result<DateTime<Utc>> {
    let timestamp = match parse_x509_pem(bundle) {
        Ok((_, pem)) => {
            let cert = pem
                .parse_x509()
                .map_err(|e| anyhow::anyhow!("Failed to parse X.509 certificate: {e}"))?;
            cert.validity().not_after.timestamp()
        }
        Err(_) => {
            let (_, cert) = X509Certificate::from_der(bundle)
                .map_err(|e| anyhow::anyhow!("Failed to parse X.509 certificate: {e}"))?;
            cert.validity().not_after.timestamp()
        }
    };
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| anyhow::anyhow!("notAfter out of range: {timestamp}"))
}

pub fn evaluate(not_after: DateTime<Utc>, now: DateTime<Utc>, threshold_days: i64) -> CertState {
    if not_after <= now {
        return CertState::Expired;
    }
    let remaining = not_after - now;
    let days_left = remaining.num_days();
    if remaining <= Duration::days(threshold_days) {
        CertState::Expiring { days_left }
    } else {
        CertState::Valid { days_left }
    }
}

pub fn inspect(bundle: Option<&[u8]>, now: DateTime<Utc>, threshold_days: i64) -> CertState {
    let Some(bundle) = bundle else {
        return CertState::Missing;
    };
    match parse_not_after(bundle) {
        Ok(not_after) => evaluate(not_after, now, threshold_days),
        Err(e) => CertState::Unparseable(e.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Self-signed PEM valid between the two given dates.
    pub(crate) fn pem_between(from: (i32, u8, u8), to: (i32, u8, u8)) -> String {
        let mut params = rcgen::CertificateParams::new(vec!["edge.local".to_string()]);
        params.not_before = rcgen::date_time_ymd(from.0, from.1, from.2);
        params.not_after = rcgen::date_time_ymd(to.0, to.1, to.2);
        let cert = rcgen::Certificate::from_params(params).unwrap();
        cert.serialize_pem().unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn reads_not_after_from_pem() {
        let pem = pem_between((2020, 1, 1), (2030, 6, 1));
        assert_eq!(parse_not_after(pem.as_bytes()).unwrap(), at(2030, 6, 1));
    }

    #[test]
    fn reads_not_after_from_der() {
        let mut params = rcgen::CertificateParams::new(vec!["edge.local".to_string()]);
        params.not_after = rcgen::date_time_ymd(2031, 3, 4);
        let cert = rcgen::Certificate::from_params(params).unwrap();
        let der = cert.serialize_der().unwrap();
        assert_eq!(parse_not_after(&der).unwrap(), at(2031, 3, 4));
    }

    #[test]
    fn garbage_is_unparseable() {
        assert!(parse_not_after(b"not a certificate").is_err());
        let broken: &[u8] = b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            inspect(Some(broken), at(2024, 1, 1), 90),
            CertState::Unparseable(_)
        ));
    }

    #[test]
    fn threshold_decides_between_valid_and_expiring() {
        let not_after = at(2024, 6, 1);
        assert_eq!(
            evaluate(not_after, at(2024, 1, 1), 90),
            CertState::Valid { days_left: 152 }
        );
        assert_eq!(
            evaluate(not_after, at(2024, 5, 1), 90),
            CertState::Expiring { days_left: 31 }
        );
        assert_eq!(evaluate(not_after, at(2024, 6, 1), 90), CertState::Expired);
        assert!(evaluate(not_after, at(2024, 1, 1), 90).is_ok());
        assert!(!evaluate(not_after, at(2024, 5, 1), 90).is_ok());
        assert!(!CertState::Unparseable("bad".into()).is_ok());
        assert_eq!(evaluate(not_after, at(2025, 1, 1), 90), CertState::Expired);
    }

    #[test]
    fn missing_bundle_is_ok() {
        let state = inspect(None, at(2024, 1, 1), 90);
        assert_eq!(state, CertState::Missing);
        assert!(state.is_ok());
    }
}
