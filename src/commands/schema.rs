//! `devhub schema` - print schema declarations as JSON

use anyhow::{Context as AnyhowContext, Result};
use serde_json::{Map, Value};

use crate::resource::Kind;

fn schemas(kind: Option<Kind>) -> Result<Value> {
    let kinds: Vec<Kind> = match kind {
        Some(kind) => vec![kind],
        None => Kind::ALL.to_vec(),
    };

    let mut out = Map::new();
    for kind in kinds {
        let schema = serde_json::to_value(kind.schema())
            .with_context(|| format!("Failed to serialize the {kind} schema"))?;
        out.insert(kind.type_name().to_string(), schema);
    }
    Ok(Value::Object(out))
}

pub fn run(kind: Option<Kind>) -> Result<()> {
    let out = serde_json::to_string_pretty(&schemas(kind)?)?;
    println!("{out}");
    Ok(())
}
