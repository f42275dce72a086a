//! Redundant row-level-security policies on the hosted database.
//!
//! The list is rendered into a `DROP POLICY IF EXISTS` script for an
//! operator to review and apply. Nothing here touches a database.

use serde::Serialize;

/// A (table, policy name) pair in the `public` schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Policy {
    pub table: &'static str,
    pub policy: &'static str,
}

impl Policy {
    const fn new(table: &'static str, policy: &'static str) -> Self {
        Self { table, policy }
    }

    /// `DROP POLICY IF EXISTS "<policy>" ON public."<table>";`
    pub fn drop_statement(&self) -> String {
        format!(
            "DROP POLICY IF EXISTS {} ON public.{};",
            quote_ident(self.policy),
            quote_ident(self.table)
        )
    }
}

/// Double-quote an identifier, doubling embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub const POLICIES: &[Policy] = &[
    Policy::new("ab_tests", "Enable read for active tests or admins"),
    Policy::new("admin_revenue_analytics", "Enable read for all authenticated users"),
    Policy::new("ai_analysis", "Enable read for own analysis or admins"),
    Policy::new("ai_intelligence_metrics", "Admin read AI metrics"),
    Policy::new("analytics_events", "Enable read for own events or admins"),
    Policy::new("announcements", "Enable read for active announcements or admins"),
    Policy::new("api_key_audit", "Admins can manage API keys"),
    Policy::new("app_admins", "Global admins manage app_admins"),
    Policy::new("audit_log", "audit_log admin bypass"),
    Policy::new("audit_trail", "audit_trail_admin_read"),
    Policy::new("bid_collaborators", "Enable read for bid members or admins"),
    Policy::new("bid_specifications", "Enable read for accessible bids or admins"),
    Policy::new("books", "books_public_read"),
    Policy::new("budget_alerts", "Enable full access for org members or admins"),
    Policy::new("chat_channels", "read_channels"),
    Policy::new("chat_messages", "ai_select_chat_messages"),
    Policy::new("cleaning_plans", "cleaning_plans_select_own"),
    Policy::new("collaboration_sessions", "Enable read for participants or admins"),
    Policy::new("commission_payouts", "Bidder can select their own payouts"),
    Policy::new("companies", "companies admin bypass"),
    Policy::new("company_bank_accounts", "org members can read cba"),
    Policy::new("company_profiles", "company_profiles_select_optimized"),
    Policy::new("company_subscriptions", "company_subscriptions admin bypass"),
    Policy::new("company_usage", "company_usage admin bypass"),
    Policy::new("compliance_checks", "Admin read compliance"),
    Policy::new("contractor_engagements", "contractor_engagements_select"),
    Policy::new("contractor_payments", "Admins can manage contractor payments"),
    Policy::new("contractor_profiles", "contractor_profiles_select"),
    Policy::new("contractors", "Admins can update contractor compliance"),
    Policy::new("conversation_learning", "Enable read for owner or admins"),
    Policy::new("conversation_memory", "Enable read for owner or admins"),
    Policy::new("conversations", "Enable read for owner or admins"),
    Policy::new("conversion_funnels", "Enable read for active funnels or admins"),
    Policy::new("cost_alerts", "Enable read for owners or admins"),
    Policy::new("cost_metrics", "auth can read cost_metrics"),
    Policy::new("crm_contacts", "crm_contacts_user_rw"),
    Policy::new("custom_training_data", "Enable read for owners or admins"),
    Policy::new("customers", "customers_admin_access"),
    Policy::new("decentralized_events", "Enable read for owners or admins"),
    Policy::new("deployed_models", "Enable read for owners or admins"),
    Policy::new("deployment_metrics", "deployment_metrics_parent_read"),
    Policy::new("deployments", "deployments_owner_select"),
    Policy::new("email_campaigns", "Enable full access for owners or admins"),
    Policy::new("email_sends", "Unified access for campaign owners and admins"),
    Policy::new("email_subscribers", "Enable read for admins only"),
    Policy::new("email_templates", "Enable read for owners or admins"),
    Policy::new("employees", "employees_select"),
    Policy::new("feature_flags", "feature_flags_select_org_members"),
    Policy::new("fine_tuned_models", "Enable read for owners or admins"),
    Policy::new("governance_changes", "R.O.M.A.N read only on governance_changes"),
    Policy::new("governance_log", "Admins can view all governance actions"),
    Policy::new("governance_principles", "R.O.M.A.N read only on governance_principles"),
    Policy::new("gps_tracking_log", "Enable read for owners or admins"),
    Policy::new("handbook_acknowledgments", "users_read_own_acknowledgments"),
    Policy::new("handbook_content", "auth can read handbook_content"),
    Policy::new("handbook_quiz_results", "hqr_select_consolidated"),
    Policy::new("handbook_section_history", "hsh_select_consolidated"),
    Policy::new("homework_sessions", "Users can manage their own homework sessions"),
    Policy::new("incoming_payment_links", "incoming_payment_links_select"),
    Policy::new("industry_templates", "Enable read for authenticated users or admins"),
    Policy::new("invoice_items", "users_can_read_own_invoice_items"),
    Policy::new("media_users", "Users can view and update their own media_user profile"),
    Policy::new("model_evaluations", "Enable full access for owners or admins"),
    Policy::new("monthly_billing", "Bidder can select billing data for their contracts"),
    Policy::new("navigation_menus", "Enable read for active menus or admins"),
    Policy::new("organizations", "Enable read for organization members"),
    Policy::new("payment_intents_log", "consolidated_select_payment_intents"),
    Policy::new("payments", "payments_owner_select"),
    Policy::new("payments_v2", "consolidated_select_payments"),
    Policy::new("payroll_rules", "Admins/Owners can manage payroll_rules"),
    Policy::new("paystubs", "Enable read for own paystubs"),
    Policy::new("performance_metrics", "Enable full access for owners or admins"),
    Policy::new("performance_snapshots", "Admin read snapshots"),
    Policy::new("plan_limits", "read_public"),
    Policy::new("plans", "read_public"),
    Policy::new("position_lots", "position_lots_owner_all"),
    Policy::new("products", "products_select_optimized"),
    Policy::new("query_cache", "Enable full access for owners or admins"),
    Policy::new("rate_limits", "Enable read for owners or admins"),
    Policy::new("recurring_invoices", "recurring_invoices_sovereign_access"),
    Policy::new("rollback_events", "rollback_events_parent_read"),
    Policy::new("roman_commands", "Enable access for R.O.M.A.N. and Admins"),
    Policy::new("services", "services_auth_select"),
    Policy::new("session_participants", "Enable full access for participants or admins"),
    Policy::new("shared_conversations", "Enable full access for session participants or admins"),
    Policy::new("smart_notifications", "Enable full access for owners or admins"),
    Policy::new("spending_categories", "Unified access for org members and admins"),
    Policy::new("sst_specs", "sst_specs_admin_read"),
    Policy::new("static_site_content", "Enable read for active content or admins"),
    Policy::new("stripe_events", "auth can read stripe_events"),
    Policy::new("subscription_tiers", "subscription_tiers_public_read"),
    Policy::new("subscriptions", "optimized_subscriptions_select"),
    Policy::new("system_alerts", "system_alerts_sovereign_write"),
    Policy::new("system_config", "system_config_select_auth"),
    Policy::new("system_kill_switches", "admin_read_kill_switches"),
    Policy::new("system_knowledge", "admin_read_system_knowledge"),
    Policy::new("system_logs", "admin_read_system_logs"),
    Policy::new("system_metrics", "Admin read access to system metrics"),
    Policy::new("system_settings", "manage_settings_admin"),
    Policy::new("timelogs", "timelogs_owner_all"),
    Policy::new("trade_history", "trade_history_select"),
    Policy::new("trades", "trades_owner_all"),
    Policy::new("tutoring_logs", "logs_select_by_appointment_membership"),
    Policy::new("usage_limits", "Enable read for owners or admins"),
    Policy::new("user_activities", "Enable read for owners or admins"),
    Policy::new("user_organizations", "user_orgs_select_consolidated"),
    Policy::new("user_portfolio", "user_portfolio_select"),
    Policy::new("user_roles", "Users can view own role"),
    Policy::new("user_sessions", "sessions_select_consolidated"),
    Policy::new("user_usage", "user_usage_owner_select"),
    Policy::new("voice_profiles", "Enable full access for owners or admins"),
    Policy::new("voice_training_data", "voice_training_data_select"),
    Policy::new("webhook_log", "admin_read_webhook_log"),
];

/// Policies for one table, in list order.
pub fn policies_for(table: &str) -> impl Iterator<Item = &'static Policy> + '_ {
    POLICIES.iter().filter(move |p| p.table == table)
}

/// Render the drop script, optionally restricted to one table.
///
/// Statements run inside a single transaction.
pub fn drop_script(table: Option<&str>) -> String {
    let selected: Vec<&Policy> = match table {
        Some(t) => policies_for(t).collect(),
        None => POLICIES.iter().collect(),
    };

    let mut out = String::new();
    out.push_str("-- Drop redundant permissive row-level-security policies.\n");
    out.push_str(&format!("-- {} statement(s). Review before applying.\n", selected.len()));
    if let Some(t) = table {
        out.push_str(&format!("-- table: {t}\n"));
    }
    out.push_str("BEGIN;\n");
    for p in selected {
        out.push_str(&p.drop_statement());
        out.push('\n');
    }
    out.push_str("COMMIT;\n");
    out
}
