// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (Basic auth) → Elevated (Basic auth + privileged SQL enabled)
pub mod public;    // Tier 1: No authentication required (/, /health)
pub mod protected; // Tier 2: Operator credentials required (/api/tables, /api/:table[/:id])
pub mod elevated;  // Tier 3: Privileged SQL (/api/sql-playground, /api/create-table)
