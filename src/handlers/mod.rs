// One module per resource; each exposes list/get/create/update/delete
// handlers that the router in app.rs wires to paths.
pub mod customers;
pub mod orders;
pub mod system;
