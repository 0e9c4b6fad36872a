// 3-Tier Handler Architecture
//
// Public (no auth) -> Protected (JWT auth) -> Elevated (superadmin JWT)

pub mod public;    // Tier 1: No authentication required (/auth/*, /webhooks/*)
pub mod protected; // Tier 2: JWT authentication required (/api/*)
pub mod elevated;  // Tier 3: Superadmin JWT required (/api/root/*)
