pub mod sites; // POST/GET /api/root/sites
pub mod sweep; // POST /api/root/invoices/sweep
pub mod users; // POST/GET /api/root/users
