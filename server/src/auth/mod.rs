pub mod codec;
pub mod error;
pub mod gate;
pub mod revocation;
pub mod session;

pub use codec::{DecodedToken, SignedToken, TokenCodec};
pub use error::AuthError;
pub use gate::AuthGate;
pub use revocation::{MemoryRevocationStore, RevocationStore};
pub use session::SessionLifecycle;
