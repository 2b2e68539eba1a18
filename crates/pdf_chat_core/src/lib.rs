pub mod domain;
pub mod ports;

pub use domain::{Chat, Message, NewChat, NewMessage, NewPdf, NewUser, Pdf, User};
pub use ports::{DocumentQaService, PdfStorage, PortError, PortResult};
