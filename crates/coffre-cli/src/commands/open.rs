//! `coffre open` — unlock a manifest and read its documents.
//!
//! Three modes:
//! - `--id <ID>` prints one document body and exits
//! - interactive terminal: a select loop with the inactivity watcher
//!   armed, running the same unlock/browse/lock ceremony an embedding UI
//!   runs
//! - piped output: a plain title listing
//!
//! Every path ends in a teardown wipe, whether it succeeded or not.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use dialoguer::Select;

use coffre_vault::{
    lock_store, on_unload, panic_wipe, spawn_auto_lock, unlock_shared, AutoLockTimer, Preferences,
    SessionStore, SharedSession,
};

use crate::commands::load_manifest;
use crate::input::with_passphrase;

pub fn run(manifest_path: &Path, id: Option<&str>, data_dir: Option<&Path>) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let session = SessionStore::shared(manifest);
    with_passphrase(|passphrase| unlock_shared(&session, passphrase))?;

    let result = if let Some(id) = id {
        print_document(&session, id)
    } else if std::io::stdin().is_terminal() {
        let prefs_dir = data_dir
            .or_else(|| manifest_path.parent())
            .unwrap_or_else(|| Path::new("."));
        browse(&session, prefs_dir)
    } else {
        list_documents(&session);
        Ok(())
    };

    on_unload(&session);
    result
}

fn print_document(session: &SharedSession, id: &str) -> Result<()> {
    let store = lock_store(session);
    let Some(document) = store.document(id) else {
        anyhow::bail!("no document with id {id}");
    };
    let Some(text) = document.content_str() else {
        anyhow::bail!("document {id} is not valid UTF-8");
    };
    println!("{text}");
    Ok(())
}

fn list_documents(session: &SharedSession) {
    let store = lock_store(session);
    for document in store.documents() {
        println!("{}", document_label(document));
    }
}

/// Interactive select loop over the decrypted titles.
///
/// The auto-lock watcher runs alongside, wired exactly as an embedding UI
/// would wire it: every selection counts as activity, idling past the
/// preferences timeout wipes the session out from under the menu, and
/// "Lock now" (or Esc) is the panic gesture.
fn browse(session: &SharedSession, prefs_dir: &Path) -> Result<()> {
    let preferences = Preferences::load(prefs_dir);
    let timer = Arc::new(AutoLockTimer::new(preferences.clamped_timeout_minutes()));
    let _watcher = spawn_auto_lock(Arc::clone(session), Arc::clone(&timer));

    loop {
        let entries: Vec<(String, String)> = {
            let store = lock_store(session);
            if !store.is_unlocked() {
                println!("Session locked.");
                break;
            }
            store
                .documents()
                .iter()
                .map(|d| (d.id.clone(), document_label(d)))
                .collect()
        };

        let mut items: Vec<&str> = entries.iter().map(|(_, label)| label.as_str()).collect();
        items.push("Lock now");

        let picked = Select::new()
            .with_prompt("Document (Esc locks)")
            .items(&items)
            .default(0)
            .interact_opt()?;
        timer.record_activity();

        match picked {
            Some(index) if index < entries.len() => {
                if let Some((doc_id, _)) = entries.get(index) {
                    show_document(session, doc_id);
                }
            }
            _ => {
                // Esc or the explicit "Lock now" entry.
                panic_wipe(session);
                break;
            }
        }
    }

    timer.cancel();
    Ok(())
}

fn show_document(session: &SharedSession, id: &str) {
    let store = lock_store(session);
    match store.document(id).and_then(|d| d.content_str()) {
        Some(text) => println!("\n{text}\n"),
        None => println!("\n(document is unavailable or not valid UTF-8)\n"),
    }
}

fn document_label(document: &coffre_vault::DecryptedDocument) -> String {
    let tags = if document.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", document.tags.join(", "))
    };
    format!(
        "{:<9} {}  {}{tags}",
        document.priority.as_str(),
        document.id,
        document.title,
    )
}
