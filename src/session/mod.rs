// Session state carried between check-in steps in a signed cookie

pub mod state;
pub mod token;

pub use state::{Flash, FlashLevel, Identity, RegistrationNotice, Session};
pub use token::{SessionCodec, SessionError};
