// src/plan.rs

use crate::error::{Result, SplitError};
use crate::model::{BankAccount, Item};
use crate::session::{Ingestor, Session};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// A non-interactive description of how a bill should be split.
#[derive(Debug, Deserialize)]
pub struct BillPlan {
    /// Receipt photo, relative to the plan file.
    #[serde(default)]
    pub image: Option<PathBuf>,
    /// Items entered by hand, appended after any scanned items.
    #[serde(default)]
    pub items: Vec<PlanItem>,
    #[serde(default)]
    pub people: Vec<PlanPerson>,
}

/// A hand-entered line. `price` and `quantity` may be JSON numbers or the
/// text a user typed; both go through [`Item::from_manual_entry`].
#[derive(Debug, Deserialize)]
pub struct PlanItem {
    pub name: String,
    #[serde(default)]
    pub price: Value,
    #[serde(default = "default_quantity")]
    pub quantity: Value,
}

fn default_quantity() -> Value {
    Value::from(1)
}

impl PlanItem {
    pub fn to_item(&self) -> Item {
        Item::from_manual_entry(
            &self.name,
            &field_text(&self.price),
            &field_text(&self.quantity),
        )
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PlanPerson {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    /// Indices into the bill's item list.
    pub items: Vec<usize>,
    #[serde(default)]
    pub tip_percent: f64,
    #[serde(default)]
    pub banks: Vec<BankAccount>,
}

impl BillPlan {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SplitError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| SplitError::Config(format!("invalid bill plan: {e}")))
    }

    /// Build a session from the plan. `base_dir` resolves a relative image path.
    pub async fn execute(&self, base_dir: &Path, ingestor: &Ingestor) -> Result<Session> {
        let mut session = Session::new();

        if let Some(image) = &self.image {
            let path = base_dir.join(image);
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                SplitError::Extraction(format!("cannot read {}: {e}", path.display()))
            })?;
            session.ingest(ingestor, Some(bytes.as_slice())).await?;
        }

        for item in &self.items {
            session.add_item(item.to_item());
        }

        for person in &self.people {
            let banks = person
                .banks
                .iter()
                .map(|b| BankAccount::new(&b.bank_name, &b.account_number))
                .collect::<Result<Vec<_>>>()?;
            session.assign(
                &person.name,
                &person.phone,
                &person.items,
                person.tip_percent,
                banks,
            )?;
        }

        info!(
            items = session.registry().len(),
            people = session.people().len(),
            "Bill plan applied"
        );
        Ok(session)
    }
}
