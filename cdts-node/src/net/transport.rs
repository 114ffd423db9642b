//! QUIC endpoints for context negotiation.
//!
//! TLS only encrypts the link. Peers are not identified by certificate;
//! what admits a session is context agreement, checked afterwards by the
//! Hello handshake. Both sides pin the `ring` provider and TLS 1.3 rather
//! than relying on a process-wide default.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};

/// ALPN protocol id.
pub const ALPN: &[u8] = b"cdts/1";

/// Server name clients present; the certificate is issued for it.
pub const SERVER_NAME: &str = "cdts-node";

/// Keep-alives per idle period, so one lost probe does not drop a session.
const KEEP_ALIVES_PER_IDLE: u32 = 3;

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Connection-level limits shared by both sides.
///
/// A session uses bidirectional streams only: one for the handshake, then
/// one per health check.
pub fn transport_config(idle_timeout: Duration) -> Result<quinn::TransportConfig> {
    let mut transport = quinn::TransportConfig::default();
    transport.max_idle_timeout(Some(quinn::IdleTimeout::try_from(idle_timeout)?));
    transport.keep_alive_interval(Some(idle_timeout / KEEP_ALIVES_PER_IDLE));
    transport.max_concurrent_uni_streams(0u8.into());
    Ok(transport)
}

/// Self-signed certificate for [`SERVER_NAME`].
pub fn generate_self_signed_cert(
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let certified = rcgen::generate_simple_self_signed(vec![SERVER_NAME.into()])?;
    let cert_der = CertificateDer::from(certified.cert);
    let key_der =
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));
    Ok((vec![cert_der], key_der))
}

/// Create a QUIC server endpoint bound to `addr`.
pub fn create_server_endpoint(addr: SocketAddr, idle_timeout: Duration) -> Result<quinn::Endpoint> {
    let (certs, key) = generate_self_signed_cert()?;

    let mut server_crypto = rustls::ServerConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    server_crypto.alpn_protocols = vec![ALPN.to_vec()];

    let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(
        quinn::crypto::rustls::QuicServerConfig::try_from(server_crypto)?,
    ));
    server_config.transport_config(Arc::new(transport_config(idle_timeout)?));

    Ok(quinn::Endpoint::server(server_config, addr)?)
}

/// Create a client endpoint able to reach `peer`. Any server certificate
/// is accepted.
pub fn create_client_endpoint(peer: SocketAddr, idle_timeout: Duration) -> Result<quinn::Endpoint> {
    let provider = provider();
    let mut client_crypto = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(provider)))
        .with_no_client_auth();
    client_crypto.alpn_protocols = vec![ALPN.to_vec()];

    let mut client_config = quinn::ClientConfig::new(Arc::new(
        quinn::crypto::rustls::QuicClientConfig::try_from(client_crypto)?,
    ));
    client_config.transport_config(Arc::new(transport_config(idle_timeout)?));

    let mut endpoint = quinn::Endpoint::client(unspecified_for(peer))?;
    endpoint.set_default_client_config(client_config);
    Ok(endpoint)
}

/// Ephemeral local address in the same family as `peer`.
fn unspecified_for(peer: SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

/// Accepts every server certificate but still checks handshake signatures
/// with the pinned provider.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
