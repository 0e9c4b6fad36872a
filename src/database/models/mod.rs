pub mod device_token;
pub mod invoice;
pub mod order;
pub mod service_request;
pub mod site;
pub mod ticket;
pub mod user;

pub use device_token::DeviceToken;
pub use invoice::Invoice;
pub use order::Order;
pub use service_request::ServiceRequest;
pub use site::Site;
pub use ticket::Ticket;
pub use user::User;
