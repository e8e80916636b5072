// handlers/protected - table-driven CRUD behind the Basic auth gate
//
// Every handler here re-validates the table name against the live catalog
// (through TableService) before any identifier reaches SQL text.
pub mod data;
pub mod tables;
