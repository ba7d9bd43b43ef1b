pub mod alerts;
pub mod bom;
pub mod brands;
pub mod components;
pub mod csv_io;
pub mod ledger;
pub mod locations;
pub mod lots;
pub mod reorder;
pub mod settings;
pub mod skus;
pub mod transactions;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::notifications::Notifier;

/// Business-logic layer consumed by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub brands: brands::BrandsService,
    pub components: components::ComponentsService,
    pub locations: locations::LocationsService,
    pub lots: lots::LotsService,
    pub skus: skus::SkusService,
    pub bom: bom::BomService,
    pub transactions: transactions::TransactionService,
    pub ledger: ledger::LedgerService,
    pub reorder: reorder::ReorderService,
    pub settings: settings::SettingsService,
    pub csv: csv_io::CsvService,
    pub alerts: alerts::AlertService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, notifier: Arc<dyn Notifier>) -> Self {
        let ledger = ledger::LedgerService::new(db.clone());
        let reorder = reorder::ReorderService::new(db.clone());
        let settings = settings::SettingsService::new(db.clone());
        let components = components::ComponentsService::new(
            db.clone(),
            ledger.clone(),
            reorder.clone(),
            settings.clone(),
        );
        let brands = brands::BrandsService::new(db.clone());
        let locations = locations::LocationsService::new(db.clone());
        let lots = lots::LotsService::new(db.clone());
        let skus = skus::SkusService::new(db.clone());
        let bom = bom::BomService::new(db.clone(), event_sender.clone());
        let transactions =
            transactions::TransactionService::new(db.clone(), event_sender.clone());
        let csv = csv_io::CsvService::new(
            db.clone(),
            components.clone(),
            skus.clone(),
            transactions.clone(),
        );
        let alerts = alerts::AlertService::new(
            db,
            ledger.clone(),
            settings.clone(),
            event_sender,
            notifier,
        );

        Self {
            brands,
            components,
            locations,
            lots,
            skus,
            bom,
            transactions,
            ledger,
            reorder,
            settings,
            csv,
            alerts,
        }
    }
}
