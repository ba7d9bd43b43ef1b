pub mod bom_line;
pub mod bom_version;
pub mod brand;
pub mod company;
pub mod component;
pub mod inventory_transaction;
pub mod location;
pub mod lot;
pub mod sku;
pub mod stock_balance;
pub mod tenant_settings;
pub mod transaction_line;
pub mod user;
