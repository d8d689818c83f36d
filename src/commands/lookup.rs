//! `devhub lookup` - read-only user and role lookups

use anyhow::Result;
use devhub_client::Client;

use crate::Context;
use crate::cli::LookupCommand;
use crate::config::{Declarations, ProviderConfig};
use crate::paths;
use crate::resource::lookup;
use crate::ui;

pub fn run(ctx: &Context, file: Option<&str>, cmd: LookupCommand) -> Result<()> {
    let declarations = Declarations::load_or_default(&paths::declarations_file(file)?)?;
    let provider = ProviderConfig::resolve(&declarations.provider)?;
    let client = Client::new(&provider.client_config());

    match cmd {
        LookupCommand::User { email, name } => {
            let user = lookup::user(&client, email, name)?;
            if !ctx.quiet {
                ui::section(lookup::USER_TYPE_NAME);
            }
            ui::kv("id", &user.id);
            ui::kv("name", &user.name);
            ui::kv("email", &user.email);
        }
        LookupCommand::Role { name } => {
            let role = lookup::role(&client, &name)?;
            if !ctx.quiet {
                ui::section(lookup::ROLE_TYPE_NAME);
            }
            ui::kv("id", &role.id);
            ui::kv("name", &role.name);
            if !role.description.is_empty() {
                ui::kv("description", &role.description);
            }
            ui::kv("managed", &role.managed.to_string());
        }
    }
    Ok(())
}
