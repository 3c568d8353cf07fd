//! Rendering of service access answers (human tables or JSON).
//!
//! Plans are grouped strictly by adjacency: the actor already guarantees
//! that a broker's plans are contiguous, so nothing here re-sorts.

#![forbid(unsafe_code)]

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use svcaccess_actor::{AccessFilter, ServiceAccessReply};
use svcaccess_core::{Access, ServicePlanAccess, Warnings};
use tracing::debug;

pub const NO_PLANS_MESSAGE: &str = "No service plans found.";

const TABLE_PREFIX: &str = "   ";
const TABLE_PADDING: usize = 3;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    #[default]
    Human,
    Json,
}

/// "Getting service access ... as USER..." with typed substitution fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessHeading {
    pub broker: Option<String>,
    pub service_offering: Option<String>,
    pub organization: Option<String>,
    pub user: String,
}

impl AccessHeading {
    pub fn for_filter(filter: &AccessFilter, user: impl Into<String>) -> Self {
        Self {
            broker: filter.service_broker_name().map(str::to_string),
            service_offering: filter.service_offering_name().map(str::to_string),
            organization: filter.organization_name().map(str::to_string),
            user: user.into(),
        }
    }
}

impl fmt::Display for AccessHeading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut scopes = Vec::new();
        if let Some(b) = &self.broker { scopes.push(format!("broker {b}")); }
        if let Some(s) = &self.service_offering { scopes.push(format!("service {s}")); }
        if let Some(o) = &self.organization { scopes.push(format!("organization {o}")); }
        f.write_str("Getting service access")?;
        if !scopes.is_empty() {
            write!(f, " for {}", scopes.join(" and "))?;
        }
        write!(f, " as {}...", self.user)
    }
}

pub fn access_label(access: Access) -> &'static str {
    match access {
        Access::Public => "all",
        Access::AdminOnly => "none",
        Access::Limited => "limited",
    }
}

/// A maximal run of consecutive plans from one broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerGroup<'a> {
    pub broker_name: &'a str,
    pub plans: &'a [ServicePlanAccess],
}

impl BrokerGroup<'_> {
    /// Column headers, chosen by the first plan of the group.
    pub fn headers(&self) -> [&'static str; 4] {
        match self.plans.first() {
            Some(p) if p.is_space_scoped() => ["service", "plan", "access", "space"],
            _ => ["service", "plan", "access", "orgs"],
        }
    }

    pub fn rows(&self) -> Vec<[String; 4]> {
        self.plans
            .iter()
            .map(|p| {
                [
                    p.service_offering_name.clone(),
                    p.service_plan_name.clone(),
                    access_label(p.access).to_string(),
                    p.scopes.join(","),
                ]
            })
            .collect()
    }
}

pub fn group_by_broker(plans: &[ServicePlanAccess]) -> Vec<BrokerGroup<'_>> {
    plans
        .chunk_by(|a, b| a.broker_name == b.broker_name)
        .map(|run| BrokerGroup { broker_name: &run[0].broker_name, plans: run })
        .collect()
}

fn write_table<W: Write>(out: &mut W, header: [&str; 4], rows: &[[String; 4]]) -> io::Result<()> {
    let mut widths = header.map(|h| h.chars().count());
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let header = header.map(str::to_string);
    for row in std::iter::once(&header).chain(rows) {
        let mut line = String::from(TABLE_PREFIX);
        for (i, cell) in row.iter().enumerate() {
            line.push_str(cell);
            if i + 1 < row.len() {
                let pad = widths[i] - cell.chars().count() + TABLE_PADDING;
                line.extend(std::iter::repeat(' ').take(pad));
            }
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

/// One `broker: NAME` heading and table per broker group, or the no-plans message.
pub fn render_human<W: Write>(out: &mut W, plans: &[ServicePlanAccess]) -> io::Result<()> {
    if plans.is_empty() {
        return writeln!(out, "{NO_PLANS_MESSAGE}");
    }
    let groups = group_by_broker(plans);
    debug!(plans = plans.len(), groups = groups.len(), "view: rendering tables");
    for g in groups {
        writeln!(out, "broker: {}", g.broker_name)?;
        write_table(out, g.headers(), &g.rows())?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn render_warnings<W: Write>(out: &mut W, warnings: &Warnings) -> io::Result<()> {
    for w in warnings {
        writeln!(out, "{w}")?;
    }
    Ok(())
}

pub fn render_json<W: Write>(out: &mut W, plans: &[ServicePlanAccess], warnings: &Warnings) -> io::Result<()> {
    #[derive(Serialize)]
    struct Answer<'a> {
        plans: &'a [ServicePlanAccess],
        warnings: &'a Warnings,
    }
    serde_json::to_writer_pretty(&mut *out, &Answer { plans, warnings })?;
    writeln!(out)
}

/// Present a full reply: warnings go to `diag` first, then either the error
/// (also to `diag`) or the answer (to `out`).
pub fn render_reply<W: Write, D: Write>(
    out: &mut W,
    diag: &mut D,
    reply: &ServiceAccessReply,
    format: Output,
) -> io::Result<()> {
    match format {
        Output::Human => render_warnings(diag, &reply.warnings)?,
        Output::Json if reply.result.is_err() => render_warnings(diag, &reply.warnings)?,
        Output::Json => {}
    }
    match (&reply.result, format) {
        (Err(e), _) => writeln!(diag, "error: {e}"),
        (Ok(plans), Output::Human) => render_human(out, plans),
        (Ok(plans), Output::Json) => render_json(out, plans, &reply.warnings),
    }
}
