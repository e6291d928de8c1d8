use std::{env, fs, path::Path};

use anyhow::Context;
use ts_rs::TS;

const HEADER: &str = "// This file was generated by `crates/server/src/bin/generate_types.rs`.\n\n// Do not edit this file manually.";

fn generate_types_content() -> String {
    let decls: Vec<String> = vec![
        utils::response::ApiResponse::<(), ()>::decl(),
        db::pagination::PageRequest::decl(),
        db::pagination::Page::<()>::decl(),
        db::models::work_status::WorkStatus::decl(),
        db::models::customer::Customer::decl(),
        db::models::customer::CreateCustomer::decl(),
        db::models::mechanic::Mechanic::decl(),
        db::models::mechanic::CreateMechanic::decl(),
        db::models::motorcycle_model::MotorcycleModel::decl(),
        db::models::motorcycle_model::CreateMotorcycleModel::decl(),
        db::models::motorcycle_model::MotorcycleModelWithCount::decl(),
        db::models::motorcycle::Motorcycle::decl(),
        db::models::motorcycle::MotorcycleSummary::decl(),
        db::models::motorcycle::CreateMotorcycle::decl(),
        db::models::supplier::Supplier::decl(),
        db::models::supplier::SupplierWithPartCount::decl(),
        db::models::supplier::CreateSupplier::decl(),
        db::models::part::Part::decl(),
        db::models::part::PartWithSupplier::decl(),
        db::models::part::CreatePart::decl(),
        db::models::part::UpdatePart::decl(),
        db::models::appointment::AppointmentStatus::decl(),
        db::models::appointment::Appointment::decl(),
        db::models::appointment::AppointmentSummary::decl(),
        db::models::appointment::CreateAppointment::decl(),
        db::models::appointment::UpdateAppointment::decl(),
        db::models::work_order::WorkOrder::decl(),
        db::models::work_order::WorkOrderSummary::decl(),
        db::models::work_order::WorkOrderPart::decl(),
        db::models::work_order::WorkOrderPartLine::decl(),
        db::models::work_order::CreateWorkOrder::decl(),
        db::models::work_order::UpdateWorkOrder::decl(),
        db::models::work_order::AddWorkOrderPart::decl(),
        db::models::work_session::SessionType::decl(),
        db::models::work_session::WorkSession::decl(),
        db::models::work_session::WorkSessionSummary::decl(),
        db::models::work_session::CreateWorkSession::decl(),
        db::models::work_session::UpdateWorkSession::decl(),
        db::models::invoice::InvoiceStatus::decl(),
        db::models::invoice::InvoiceAmounts::decl(),
        db::models::invoice::Invoice::decl(),
        db::models::invoice::InvoiceSummary::decl(),
        services::services::validation::ValidationErrors::decl(),
        services::services::config::Config::decl(),
        services::services::health::DatabaseHealth::decl(),
        services::services::customers::CustomerProfile::decl(),
        services::services::staff::MechanicOverview::decl(),
        services::services::fleet::MotorcycleModelDetails::decl(),
        services::services::fleet::MotorcycleDetails::decl(),
        services::services::inventory::SupplierDetails::decl(),
        services::services::inventory::StockAdjustment::decl(),
        services::services::work_orders::WorkOrderDetails::decl(),
        services::services::billing::GenerateInvoice::decl(),
        services::services::billing::InvoiceDetails::decl(),
        services::services::billing::FinancialSummary::decl(),
        services::services::dashboard::DashboardStats::decl(),
        services::services::portal::PortalBooking::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| {
            let trimmed = decl.trim_start();
            if trimmed.starts_with("export") {
                trimmed.to_string()
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{HEADER}\n\n{body}\n")
}

/// Writes `shared/types.ts`, or with `--check` fails when the file is stale.
fn main() -> anyhow::Result<()> {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path)
            .with_context(|| format!("cannot read {}", types_path.display()))?;
        if current != generated {
            anyhow::bail!("shared/types.ts is out of date, run generate_types");
        }
        println!("shared/types.ts is up to date");
        return Ok(());
    }

    fs::create_dir_all(&shared_path)?;
    fs::write(&types_path, generated)?;
    println!("Wrote {}", types_path.display());
    Ok(())
}
