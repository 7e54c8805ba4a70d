//! Data models and structures for the readiness prober

pub mod config;
pub mod envelope;
pub mod result;
pub mod targets;

// Re-export main model types
pub use config::Config;
pub use envelope::{ResultEnvelope, RunSummary};
pub use result::{BandwidthTier, ProbeDetail, ProbeResult, QuicProtocol, SpeedSource, TlsInfo};
pub use targets::{HttpsTarget, QuicTarget, TargetSet, TcpTarget, UdpRangeTarget};
