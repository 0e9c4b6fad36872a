pub mod payments;
pub mod push;
pub mod qr_token;
pub mod request_service;
pub mod site_service;
pub mod video;
