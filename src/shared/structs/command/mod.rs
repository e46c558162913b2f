use std::collections::HashMap;
use std::sync::Arc;

use crate::shared::structs::discord::interaction::{
    CommandDataOption, CommandInteraction, SUB_COMMAND_GROUP_OPTION_TYPE, SUB_COMMAND_OPTION_TYPE,
};
use crate::shared::structs::discord::response::Choice;
use crate::shared::structs::handler::{AutocompleteHandler, CommandHandler};

/// An option a command declares to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptionSpec {
    pub name: String,
    pub description: String,
    pub r#type: u8,
    pub required: bool,
    pub autocomplete: bool,
}

impl CommandOptionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, r#type: u8) -> Self {
        CommandOptionSpec {
            name: name.into(),
            description: description.into(),
            r#type,
            required: false,
            autocomplete: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn autocomplete(mut self, autocomplete: bool) -> Self {
        self.autocomplete = autocomplete;
        self
    }
}

/// A locally registered command.
///
/// `name` is the full invocation path: `"settings"` for a root command,
/// `"settings theme"` for a subcommand and `"settings display theme"` for a
/// subcommand inside a group.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: String,
    pub available_in_dm: bool,
    pub options: Vec<CommandOptionSpec>,
    pub handler: CommandHandler,
    pub autocomplete: Option<AutocompleteHandler>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("available_in_dm", &self.available_in_dm)
            .field("options", &self.options)
            .field("autocomplete", &self.autocomplete.is_some())
            .finish()
    }
}

impl Command {
    pub fn new(name: impl Into<String>, handler: CommandHandler) -> Self {
        Command {
            name: name.into(),
            description: String::new(),
            available_in_dm: false,
            options: Vec::new(),
            handler,
            autocomplete: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn available_in_dm(mut self, available_in_dm: bool) -> Self {
        self.available_in_dm = available_in_dm;
        self
    }

    pub fn option(mut self, option: CommandOptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn autocomplete<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CommandInteraction) -> Vec<Choice> + Send + Sync + 'static,
    {
        self.autocomplete = Some(Arc::new(handler));
        self
    }
}

/// Maps invocation paths to commands.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, returning the one it replaced.
    pub fn register(&mut self, command: Command) -> Option<Arc<Command>> {
        let path = normalize_path(&command.name);
        self.commands.insert(path, Arc::new(command))
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Command>> {
        self.commands.get(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Finds the command an interaction invokes.
    ///
    /// The returned interaction is a view whose options are those of the leaf
    /// subcommand, so handlers never have to unwrap subcommand nesting.
    pub fn resolve(
        &self,
        interaction: &CommandInteraction,
    ) -> Option<(Arc<Command>, CommandInteraction)> {
        let (path, options) = invocation_path(&interaction.data.name, &interaction.data.options);
        let command = self.commands.get(&path)?.clone();

        let mut view = interaction.clone();
        view.data.options = options.to_vec();
        Some((command, view))
    }
}

fn normalize_path(path: &str) -> String {
    path.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn invocation_path<'a>(
    root: &str,
    mut options: &'a [CommandDataOption],
) -> (String, &'a [CommandDataOption]) {
    let mut path = root.to_string();

    while let Some(first) = options.first() {
        match first.r#type {
            SUB_COMMAND_GROUP_OPTION_TYPE => {
                path.push(' ');
                path.push_str(&first.name);
                options = &first.options;
            }
            SUB_COMMAND_OPTION_TYPE => {
                path.push(' ');
                path.push_str(&first.name);
                options = &first.options;
                break;
            }
            _ => break,
        }
    }

    (path, options)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::shared::structs::handler::into_command_handler;

    fn command(name: &str) -> Command {
        Command::new(name, into_command_handler(|_| async { anyhow::Ok(()) }))
    }

    fn interaction(data: serde_json::Value) -> CommandInteraction {
        serde_json::from_value(json!({
            "id": "1",
            "application_id": "2",
            "type": 2,
            "token": "token",
            "data": data
        }))
        .unwrap()
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(command("ping"));
        registry.register(command("settings theme"));
        registry.register(command("settings  display   density"));
        registry
    }

    #[test]
    fn resolves_root_command() {
        let itx = interaction(json!({
            "id": "10",
            "name": "ping",
            "options": [{"name": "loud", "type": 5, "value": true}]
        }));

        let (command, view) = registry().resolve(&itx).unwrap();
        assert_eq!(command.name, "ping");
        assert_eq!(view.data.options.len(), 1);
    }

    #[test]
    fn resolves_subcommand_and_flattens_options() {
        let itx = interaction(json!({
            "id": "10",
            "name": "settings",
            "options": [{
                "name": "theme",
                "type": 1,
                "options": [{"name": "color", "type": 3, "value": "dark"}]
            }]
        }));

        let (command, view) = registry().resolve(&itx).unwrap();
        assert_eq!(command.name, "settings theme");
        assert_eq!(view.data.option("color").unwrap().as_str(), Some("dark"));
        assert_eq!(itx.data.options[0].name, "theme");
    }

    #[test]
    fn resolves_subcommand_inside_group() {
        let itx = interaction(json!({
            "id": "10",
            "name": "settings",
            "options": [{
                "name": "display",
                "type": 2,
                "options": [{
                    "name": "density",
                    "type": 1,
                    "options": [{"name": "level", "type": 4, "value": 3}]
                }]
            }]
        }));

        let (command, view) = registry().resolve(&itx).unwrap();
        assert_eq!(command.name, "settings  display   density");
        assert_eq!(view.data.options[0].name, "level");
    }

    #[test]
    fn reports_unregistered_command() {
        let itx = interaction(json!({"id": "10", "name": "unknown"}));
        assert!(registry().resolve(&itx).is_none());

        let itx = interaction(json!({
            "id": "10",
            "name": "settings",
            "options": [{"name": "language", "type": 1}]
        }));
        assert!(registry().resolve(&itx).is_none());
    }

    #[test]
    fn registering_same_path_replaces_command() {
        let mut registry = registry();
        let replaced = registry.register(command("settings theme").available_in_dm(true));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 3);
        assert!(registry.get("settings theme").unwrap().available_in_dm);
    }
}
