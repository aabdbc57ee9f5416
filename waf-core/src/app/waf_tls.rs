//! Dynamic, SNI-driven TLS certificate selection.
//!
//! Pingora's TLS listener accepts a [`TlsAccept`] callback that runs during
//! the handshake before a certificate has been chosen, letting this module
//! pick the cert/key pair for whichever domain the ClientHello's SNI names.
//! An unknown or non-HTTPS SNI leaves no certificate installed, which fails
//! the handshake with `unrecognized_name` rather than falling back to any
//! other domain's certificate.

use async_trait::async_trait;
use pingora::listeners::tls::TlsAccept;
use pingora::tls::ext;
use pingora::tls::pkey::PKey;
use pingora::tls::ssl::{NameType, SslRef};
use pingora::tls::x509::X509;

use crate::waf::cache::ConfigCache;

pub struct SniCertResolver {
    cache: &'static ConfigCache,
}

impl SniCertResolver {
    pub fn new(cache: &'static ConfigCache) -> SniCertResolver {
        SniCertResolver { cache }
    }
}

#[async_trait]
impl TlsAccept for SniCertResolver {
    async fn certificate_callback(&self, ssl: &mut SslRef) {
        let Some(sni) = ssl.servername(NameType::HOST_NAME) else {
            log::warn!("TLS handshake with no SNI; failing with unrecognized_name");
            return;
        };

        let Some(view) = self.cache.domain_view(sni) else {
            log::warn!("TLS handshake for unknown SNI '{}'; failing with unrecognized_name", sni);
            return;
        };

        if !view.domain.is_https() || !view.domain.has_cert_pair() {
            log::warn!("SNI '{}' resolved to a non-HTTPS or incomplete domain; failing handshake", sni);
            return;
        }

        let (Some(cert_pem), Some(key_pem)) = (&view.domain.tls_cert, &view.domain.tls_key) else {
            return;
        };

        let cert = match X509::from_pem(cert_pem.as_bytes()) {
            Ok(c) => c,
            Err(e) => {
                log::error!("failed to parse cert for domain '{}': {}", sni, e);
                return;
            }
        };
        let key = match PKey::private_key_from_pem(key_pem.as_bytes()) {
            Ok(k) => k,
            Err(e) => {
                log::error!("failed to parse key for domain '{}': {}", sni, e);
                return;
            }
        };

        if let Err(e) = ext::ssl_use_certificate(ssl, &cert) {
            log::error!("failed to install certificate for '{}': {}", sni, e);
        }
        if let Err(e) = ext::ssl_use_private_key(ssl, &key) {
            log::error!("failed to install private key for '{}': {}", sni, e);
        }
    }
}
