use anyhow::{bail, Context, Result};
use warden_core::{Tenant, TenantCategory};
use warden_infra::FileTenantRegistry;

pub fn handle_list(registry: &FileTenantRegistry) -> Result<Vec<Tenant>> {
    let tenants = registry
        .load()
        .with_context(|| format!("Failed to read {}", registry.path().display()))?;

    if tenants.is_empty() {
        println!("No tenants configured.");
        return Ok(tenants);
    }

    println!("{:<24} {:<28} {:<14} {:<8}", "ID", "NAME", "CATEGORY", "ACTIVE");
    println!("{:-<24} {:-<28} {:-<14} {:-<8}", "", "", "", "");
    for t in &tenants {
        let category = match t.category {
            TenantCategory::ProductOnly => "product-only",
            TenantCategory::FullService => "full-service",
        };
        let active = if t.active { "yes" } else { "no" };
        println!("{:<24} {:<28} {:<14} {:<8}", t.id, t.name, category, active);
    }

    Ok(tenants)
}

pub fn handle_add(
    registry: &FileTenantRegistry,
    id: String,
    name: String,
    token: String,
    category: TenantCategory,
    inactive: bool,
) -> Result<Tenant> {
    if token.trim().is_empty() {
        bail!("API key cannot be empty");
    }
    let tenant = Tenant {
        id,
        name,
        token,
        active: !inactive,
        category,
    };
    registry.add(tenant.clone())?;
    println!("Tenant '{}' ({}) added.", tenant.name, tenant.id);
    Ok(tenant)
}

pub fn handle_remove(registry: &FileTenantRegistry, id: &str) -> Result<()> {
    if !registry.remove(id)? {
        bail!("Tenant '{}' not found", id);
    }
    println!("Tenant '{}' removed.", id);
    Ok(())
}

pub fn handle_set_active(registry: &FileTenantRegistry, id: &str, active: bool) -> Result<()> {
    registry.set_active(id, active)?;
    let state = if active { "activated" } else { "deactivated" };
    println!("Tenant '{}' {}.", id, state);
    Ok(())
}
