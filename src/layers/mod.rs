//! The layered network stack: TCP → TPKT → X.224 → MCS → Security → RDP
//! Data / Fast-Path. Each layer owns parsing/serialization for its frame
//! type; layers are composed once at session construction and are not
//! relinked afterwards.

pub mod fast_path;
pub mod licensing;
pub mod mcs;
pub mod rdp_data;
pub mod security;
pub mod tcp;
pub mod tpkt;
pub mod x224;
