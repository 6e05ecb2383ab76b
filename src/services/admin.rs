// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin write operations: clients, employees and inbox broadcasts.
//!
//! Writes are plain independent store calls with no transaction. After a
//! successful write the affected view slices are reloaded.

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::models::{ClientDoc, InboxDoc, Role, User};
use crate::services::session::SubscriptionManager;
use crate::services::storage::ObjectStore;
use crate::services::view::Slice;
use chrono::Utc;
use futures_util::future::try_join_all;
use serde::Deserialize;
use std::sync::Arc;
use validator::{Validate, ValidationError};

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("This field is required.".into());
        return Err(err);
    }
    Ok(())
}

/// Contact fields shared by clients and employees.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileForm {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "not_blank"), email)]
    pub email: String,
    #[validate(custom(function = "not_blank"))]
    pub phone: String,
    #[validate(custom(function = "not_blank"))]
    pub address: String,
}

/// Client sign-up form: the owning user plus the site.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientForm {
    #[serde(flatten)]
    #[validate(nested)]
    pub profile: ProfileForm,
    #[validate(custom(function = "not_blank"))]
    pub sitename: String,
    #[validate(custom(function = "not_blank"))]
    pub sitelocation: String,
    #[validate(custom(function = "not_blank"))]
    pub siteaddress: String,
    #[validate(custom(function = "not_blank"))]
    pub poc: String,
    /// Employee user IDs assigned to the site
    #[serde(default)]
    pub employees: Vec<String>,
}

/// One image attached to an inbox broadcast.
#[derive(Debug, Clone)]
pub struct InboxUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
        return Err(AppError::Validation(format!(
            "Invalid file name: {:?}",
            name
        )));
    }
    Ok(())
}

fn profile_user(profile: &ProfileForm, role: Role) -> User {
    let mut user = User {
        active: true,
        role: vec![role.as_str().to_string()],
        ..Default::default()
    };
    apply_profile(&mut user, profile);
    user
}

/// Copy the editable contact fields onto a stored user.
fn apply_profile(user: &mut User, profile: &ProfileForm) {
    user.name = profile.name.trim().to_string();
    user.email = profile.email.trim().to_string();
    user.phone = profile.phone.trim().to_string();
    user.address = profile.address.trim().to_string();
}

fn apply_site(doc: &mut ClientDoc, form: &ClientForm) {
    doc.sitename = form.sitename.trim().to_string();
    doc.sitelocation = form.sitelocation.trim().to_string();
    doc.siteaddress = form.siteaddress.trim().to_string();
    doc.poc = form.poc.trim().to_string();
    doc.users = form.employees.clone();
}

/// Write-side service behind the admin screens.
pub struct AdminService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    subscriptions: Arc<SubscriptionManager>,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        subscriptions: Arc<SubscriptionManager>,
    ) -> Self {
        Self {
            store,
            objects,
            subscriptions,
        }
    }

    /// Reload slices after a write. A failed reload does not fail the write.
    async fn reload(&self, slices: &[Slice]) {
        if let Err(e) = self.subscriptions.refresh_all(slices).await {
            tracing::warn!(error = %e, "Reload after write failed");
        }
    }

    async fn existing_user(&self, id: &str) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    // ─── Clients ─────────────────────────────────────────────────

    /// Add the client's user and then its site. Returns the new user ID.
    ///
    /// If the site write fails the user document is left in place.
    pub async fn create_client(&self, form: ClientForm) -> Result<String> {
        form.validate()?;

        let user_id = self
            .store
            .insert_user(&profile_user(&form.profile, Role::Client))
            .await?;

        let mut site = ClientDoc {
            user_id: user_id.clone(),
            createdat: Some(Utc::now()),
            ..Default::default()
        };
        apply_site(&mut site, &form);

        if let Err(e) = self.store.insert_client(&site).await {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Client user written but site write failed"
            );
            return Err(e);
        }

        tracing::info!(user_id = %user_id, site = %site.sitename, "Created client");
        self.reload(&[Slice::Users, Slice::Clients]).await;
        Ok(user_id)
    }

    /// Update the client's user and its first site, if any.
    pub async fn update_client(&self, user_id: &str, form: ClientForm) -> Result<()> {
        form.validate()?;

        let mut user = self.existing_user(user_id).await?;
        apply_profile(&mut user, &form.profile);
        user.active = true;
        self.store.update_user(&user).await?;

        let sites = self.store.clients_for_user(user_id).await?;
        if let Some(mut site) = sites.into_iter().next() {
            apply_site(&mut site, &form);
            if let Err(e) = self.store.update_client(&site).await {
                tracing::warn!(
                    user_id,
                    client_id = %site.id,
                    error = %e,
                    "Client user updated but site update failed"
                );
                return Err(e);
            }
        } else {
            tracing::warn!(user_id, "Client has no site document to update");
        }

        tracing::info!(user_id, "Updated client");
        self.reload(&[Slice::Users, Slice::Clients]).await;
        Ok(())
    }

    /// Delete the client's user and every site it owns.
    pub async fn delete_client(&self, user_id: &str) -> Result<()> {
        let sites = self.store.clients_for_user(user_id).await?;
        self.store.delete_user(user_id).await?;
        for site in &sites {
            self.store.delete_client(&site.id).await?;
        }

        tracing::info!(user_id, sites = sites.len(), "Deleted client");
        self.reload(&[Slice::Users, Slice::Clients]).await;
        Ok(())
    }

    // ─── Employees ───────────────────────────────────────────────

    pub async fn create_employee(&self, form: ProfileForm) -> Result<String> {
        form.validate()?;

        let user_id = self
            .store
            .insert_user(&profile_user(&form, Role::Employee))
            .await?;

        tracing::info!(user_id = %user_id, "Created employee");
        self.reload(&[Slice::Users]).await;
        Ok(user_id)
    }

    pub async fn update_employee(&self, id: &str, form: ProfileForm) -> Result<()> {
        form.validate()?;

        let mut user = self.existing_user(id).await?;
        apply_profile(&mut user, &form);
        self.store.update_user(&user).await?;

        tracing::info!(user_id = id, "Updated employee");
        self.reload(&[Slice::Users]).await;
        Ok(())
    }

    pub async fn delete_employee(&self, id: &str) -> Result<()> {
        self.store.delete_user(id).await?;

        tracing::info!(user_id = id, "Deleted employee");
        self.reload(&[Slice::Users]).await;
        Ok(())
    }

    // ─── Inbox ───────────────────────────────────────────────────

    /// Upload the images to `images/{file_name}` and post the message.
    pub async fn post_inbox_message(
        &self,
        title: &str,
        uploads: Vec<InboxUpload>,
    ) -> Result<String> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation(
                "Please fill in all fields: title".to_string(),
            ));
        }
        for upload in &uploads {
            validate_file_name(&upload.file_name)?;
        }

        let image_urls = try_join_all(uploads.into_iter().map(|upload| async move {
            let path = format!("images/{}", upload.file_name);
            self.objects
                .upload(&path, &upload.content_type, upload.bytes)
                .await
        }))
        .await?;

        let message = InboxDoc {
            id: String::new(),
            title: title.to_string(),
            created_at: Some(Utc::now()),
            image_urls,
        };
        let id = self.store.insert_inbox(&message).await?;

        tracing::info!(
            inbox_id = %id,
            images = message.image_urls.len(),
            "Posted inbox message"
        );
        self.reload(&[Slice::Inbox]).await;
        Ok(id)
    }
}
