// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (access token) → Elevated (access token + admin role)
//
// Handlers only extract and validate input, then hand off to a service.
// Ownership rules live in the services, role gates in the router.

pub mod elevated; // Tier 3: admin role required
pub mod protected; // Tier 2: JWT authentication required (/api/*)
pub mod public; // Tier 1: no authentication required
