use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fastgmail_core::{AppError, AuthError, Config, ConfigError, ReqwestErrorExt};
use fastgmail_message::{GmailClient, GmailError, Mailbox, Message};

use crate::{Cli, Commands, ToggleTarget};

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mailbox = connect(&config, cli.user)?;

    match cli.command {
        Commands::Show { id, html, date_format } => {
            let message = fetch(&mailbox, &id).await?;
            let format = date_format.unwrap_or_else(|| config.display.date_format.clone());
            show(&message, html, &format).map_err(classify)
        }
        Commands::Attachments { id, save, dir, overwrite } => {
            let message = fetch(&mailbox, &id).await?;
            let dir = dir.unwrap_or_else(|| config.attachments.download_dir.clone().into());
            let overwrite = overwrite || config.attachments.overwrite;
            attachments(&message, save.then_some(dir.as_path()), overwrite).await.map_err(classify)
        }
        Commands::Labels { id } => {
            let mut message = fetch(&mailbox, &id).await?;
            for label in message.get_labels().await.map_err(classify)? {
                let unread = label.messages_unread.map(|n| n.to_string()).unwrap_or_default();
                println!("{}\t{}\t{:?}\t{}", label.id, label.name, label.label_type, unread);
            }
            Ok(())
        }
        Commands::Label { id, add, remove } => {
            if add.is_empty() && remove.is_empty() {
                anyhow::bail!("Nothing to do: pass --add and/or --remove");
            }
            let mut message = fetch(&mailbox, &id).await?;
            let result = match (add.is_empty(), remove.is_empty()) {
                (false, true) => message.add_labels(&add).await,
                (true, false) => message.remove_labels(&remove).await,
                _ => message.modify_labels(&add, &remove).await,
            };
            result.map_err(classify)?;
            println!("{}", message.label_ids.join(" "));
            Ok(())
        }
        Commands::Toggle { id, target } => {
            let mut message = fetch(&mailbox, &id).await?;
            toggle(&mut message, target).await.map_err(classify)?;
            println!("{}", message.label_ids.join(" "));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let (config, _) = match path {
        Some(path) => Config::load_validated_from(path),
        None => Config::load_validated(),
    }
    .map_err(|e| match e.downcast::<ConfigError>() {
        Ok(config_err) => AppError::Config(config_err),
        Err(e) => AppError::Config(ConfigError::Invalid(format!("{e:#}"))),
    })?;
    Ok(config)
}

fn connect(config: &Config, user: Option<String>) -> Result<Mailbox> {
    let token = config
        .gmail
        .resolve_access_token()
        .ok_or_else(|| {
            AppError::Config(ConfigError::MissingSetting("gmail.access_token".to_string()))
        })?;

    let client = GmailClient::with_base_url(&token, &config.gmail.api_base_url);
    let user = user.unwrap_or_else(|| config.gmail.user_id.clone());
    tracing::debug!(user = %user, base_url = %client.base_url(), "Connecting to Gmail");

    Ok(Mailbox::for_user(Arc::new(client), user))
}

async fn fetch(mailbox: &Mailbox, id: &str) -> Result<Message> {
    mailbox
        .get_message(id)
        .await
        .map_err(classify)
        .with_context(|| format!("Failed to fetch message {id}"))
}

fn show(message: &Message, html: bool, date_format: &str) -> Result<(), GmailError> {
    println!("From:    {}", message.sender_header().unwrap_or_default());
    println!("To:      {}", message.recipient().unwrap_or_default());
    println!("Subject: {}", message.subject().unwrap_or_default());
    if let Some(date) = message.date_string(Some(date_format))? {
        println!("Date:    {}", date);
    }
    println!("Labels:  {}", message.label_ids.join(" "));
    println!("Flags:   {}", flags(message).join(" "));

    let attachments = message.attachments()?;
    if !attachments.is_empty() {
        let names: Vec<&str> = attachments.iter().map(|a| a.filename.as_str()).collect();
        println!("Files:   {}", names.join(", "));
    }

    let body = if html { message.html()? } else { message.plain()? };
    let body = if body.is_empty() { message.body()? } else { body };
    println!();
    println!("{}", body);
    Ok(())
}

fn flags(message: &Message) -> Vec<&'static str> {
    [
        (message.is_unread(), "unread"),
        (message.is_starred(), "starred"),
        (message.is_important(), "important"),
        (message.is_spam(), "spam"),
        (message.is_trash(), "trash"),
        (message.is_draft(), "draft"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect()
}

async fn attachments(
    message: &Message,
    save_dir: Option<&Path>,
    overwrite: bool,
) -> Result<(), GmailError> {
    let mut attachments = message.attachments()?;
    if attachments.is_empty() {
        println!("No attachments");
        return Ok(());
    }

    for attachment in &mut attachments {
        match save_dir {
            Some(dir) => {
                let target = dir.join(&attachment.filename);
                let path = attachment.save(Some(target.as_path()), overwrite).await?;
                println!("{}\t{}", attachment.filename, path.display());
            }
            None => println!(
                "{}\t{}\t{}",
                attachment.part_id.as_deref().unwrap_or("-"),
                attachment.mime_type,
                attachment.filename
            ),
        }
    }
    Ok(())
}

async fn toggle(message: &mut Message, target: ToggleTarget) -> Result<(), GmailError> {
    match target {
        ToggleTarget::Read => message.toggle_read_unread().await?,
        ToggleTarget::Starred => message.toggle_starred().await?,
        ToggleTarget::Important => message.toggle_important().await?,
        ToggleTarget::Spam => message.toggle_spam().await?,
        ToggleTarget::Trash => message.toggle_trash().await?,
    };
    Ok(())
}

/// Lift transport and auth failures into app-level errors.
fn classify(err: GmailError) -> anyhow::Error {
    match err {
        GmailError::NetworkError(e) => AppError::Network(e.into_network_error()).into(),
        GmailError::TokenExpired => AppError::Auth(AuthError::TokenExpired).into(),
        GmailError::AuthRequired => {
            AppError::Auth(AuthError::Forbidden("the Gmail API".to_string())).into()
        }
        other => other.into(),
    }
}

/// One line for the terminal, friendly text first.
pub fn describe(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<GmailError>() {
        format!("{} ({})", e.user_message(), e)
    } else if let Some(e) = err.downcast_ref::<AppError>() {
        format!("{} ({})", e.user_message(), e)
    } else {
        format!("{err:#}")
    }
}
