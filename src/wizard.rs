//! Link and image attachment wizard
//!
//! A guided flow that ends by attaching exactly one of {external URL,
//! internal page link, uploaded document, existing document, image, removal}
//! to a wizard field of a content item. The flow itself is a small state
//! machine (one discriminator step, then the branch it makes reachable)
//! and the terminal effect always lands through [`attach`]: one transaction
//! covering link/media row creation, the field or association write, and the
//! pending-edit marking.

use crate::assoc::Direction;
use crate::error::BlockError;
use crate::orm::links::LinkDestination;
use crate::orm::{documents, images, links, pages};
use crate::registry::{ContentRegistry, FieldRef};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, ConnectionTrait, DatabaseConnection, TransactionTrait,
};
use serde::Deserialize;
use url::Url;
use validator::Validate;

/// What a wizard field holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardKind {
    Image,
    Link,
}

impl WizardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardKind::Image => "image",
            WizardKind::Link => "link",
        }
    }
}

/// Single-valued field or ordered association
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Multi,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::Single => "single",
            Cardinality::Multi => "multi",
        }
    }
}

/// A wizard-attachable field declared by a content kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WizardField {
    pub name: &'static str,
    pub kind: WizardKind,
    pub cardinality: Cardinality,
}

/// Payload for a new external link
#[derive(Debug, Deserialize, Validate)]
pub struct ExternalUrlPayload {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(url)]
    pub url: String,
}

/// Payload for an uploaded document; upload completion is the caller's
/// precondition, this core only records the result.
#[derive(Debug, Deserialize, Validate)]
pub struct DocumentPayload {
    #[validate(length(min = 1, max = 100))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub original_file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Payload for an uploaded image
#[derive(Debug, Deserialize, Validate)]
pub struct ImagePayload {
    #[validate(length(min = 1, max = 100))]
    pub file_name: String,
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    pub category_id: Option<i32>,
}

/// Terminal value produced by the wizard.
#[derive(Debug)]
pub enum AttachValue {
    ExternalUrl(ExternalUrlPayload),
    InternalPage { page_id: i32 },
    UploadDocument { payload: DocumentPayload, category_id: Option<i32> },
    ExistingDocument { document_id: i32 },
    UploadImage(ImagePayload),
    ExistingImage { image_id: i32 },
    Remove,
}

impl AttachValue {
    /// The wizard kind this value fits; `Remove` fits either.
    fn kind(&self) -> Option<WizardKind> {
        match self {
            AttachValue::ExternalUrl(_)
            | AttachValue::InternalPage { .. }
            | AttachValue::UploadDocument { .. }
            | AttachValue::ExistingDocument { .. } => Some(WizardKind::Link),
            AttachValue::UploadImage(_) | AttachValue::ExistingImage { .. } => {
                Some(WizardKind::Image)
            }
            AttachValue::Remove => None,
        }
    }

    fn branch(&self) -> Branch {
        match self {
            AttachValue::ExternalUrl(_) => Branch::ExternalUrl,
            AttachValue::InternalPage { .. } => Branch::InternalPage,
            AttachValue::UploadDocument { .. } => Branch::UploadDocument,
            AttachValue::ExistingDocument { .. } => Branch::ExistingDocument,
            AttachValue::UploadImage(_) => Branch::UploadImage,
            AttachValue::ExistingImage { .. } => Branch::ExistingImage,
            AttachValue::Remove => Branch::Remove,
        }
    }
}

/// Terminal branches reachable from the discriminator step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    ExternalUrl,
    InternalPage,
    UploadDocument,
    ExistingDocument,
    UploadImage,
    ExistingImage,
    Remove,
}

impl Branch {
    fn kind(&self) -> Option<WizardKind> {
        match self {
            Branch::ExternalUrl
            | Branch::InternalPage
            | Branch::UploadDocument
            | Branch::ExistingDocument => Some(WizardKind::Link),
            Branch::UploadImage | Branch::ExistingImage => Some(WizardKind::Image),
            Branch::Remove => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardStep {
    ChooseType,
    Branch(Branch),
    Done,
}

/// Step tracker for one wizard run over one field.
///
/// Which branch is reachable derives purely from the discriminator chosen at
/// step one; there is no hidden state.
#[derive(Debug)]
pub struct WizardFlow {
    field: WizardField,
    step: WizardStep,
}

impl WizardFlow {
    pub fn start(field: WizardField) -> Self {
        Self {
            field,
            step: WizardStep::ChooseType,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn field(&self) -> &WizardField {
        &self.field
    }

    /// The discriminator step: pick a terminal branch.
    pub fn choose(&mut self, branch: Branch) -> Result<(), BlockError> {
        if self.step != WizardStep::ChooseType {
            return Err(BlockError::Configuration(
                "wizard is already past the type choice".into(),
            ));
        }
        branch_allowed(&self.field, branch)?;
        self.step = WizardStep::Branch(branch);
        Ok(())
    }

    /// Finish the chosen branch by attaching its value.
    pub async fn attach(
        &mut self,
        db: &DatabaseConnection,
        registry: &ContentRegistry,
        kind: &str,
        content_id: i32,
        value: AttachValue,
    ) -> Result<AttachOutcome, BlockError> {
        match self.step {
            WizardStep::Branch(branch) if branch == value.branch() => {}
            WizardStep::Branch(_) => {
                return Err(BlockError::Configuration(
                    "value does not belong to the chosen branch".into(),
                ))
            }
            _ => {
                return Err(BlockError::Configuration(
                    "choose a branch before attaching".into(),
                ))
            }
        }
        let outcome = attach(
            db,
            registry,
            kind,
            content_id,
            self.field.name,
            value,
            self.field.cardinality,
        )
        .await?;
        self.step = WizardStep::Done;
        Ok(outcome)
    }
}

fn branch_allowed(field: &WizardField, branch: Branch) -> Result<(), BlockError> {
    match branch.kind() {
        None => {
            // removal clears a single-valued field only
            if field.cardinality == Cardinality::Multi {
                return Err(BlockError::UnsupportedCardinality(format!(
                    "cannot remove from multi-valued field '{}', delete rows individually",
                    field.name
                )));
            }
            Ok(())
        }
        Some(kind) if kind == field.kind => Ok(()),
        Some(kind) => Err(BlockError::Configuration(format!(
            "branch kind '{}' does not fit field '{}' ({})",
            kind.as_str(),
            field.name,
            field.kind.as_str()
        ))),
    }
}

/// Result of an attach: the row the change landed on (the pending shadow
/// when the target was published) and what got attached.
#[derive(Clone, Debug)]
pub struct AttachOutcome {
    pub content_id: i32,
    pub attached: Option<FieldRef>,
}

/// Attach `value` to `field_name` of a content item.
///
/// Single cardinality overwrites the field reference; multi appends to the
/// ordered association at order max + 1. Either way the change lands on the
/// editable row (materializing the pending shadow of a published row) inside
/// one transaction.
pub async fn attach(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    kind: &str,
    content_id: i32,
    field_name: &str,
    value: AttachValue,
    cardinality: Cardinality,
) -> Result<AttachOutcome, BlockError> {
    let handler = registry.get(kind)?;
    let field = lookup_field(handler.wizard_fields(), kind, field_name)?;
    if field.cardinality != cardinality {
        return Err(BlockError::UnsupportedCardinality(format!(
            "field '{}' is {}-valued, not {}",
            field_name,
            field.cardinality.as_str(),
            cardinality.as_str()
        )));
    }
    if let Some(value_kind) = value.kind() {
        if value_kind != field.kind {
            return Err(BlockError::Configuration(format!(
                "a {} value cannot attach to field '{}' ({})",
                value_kind.as_str(),
                field_name,
                field.kind.as_str()
            )));
        }
    }
    if matches!(value, AttachValue::Remove) && cardinality == Cardinality::Multi {
        return Err(BlockError::UnsupportedCardinality(format!(
            "cannot remove from multi-valued field '{}', delete rows individually",
            field_name
        )));
    }

    let txn = db.begin().await?;
    let edit_id = handler.set_pending_edit(&txn, content_id).await?;
    let target = resolve_target(&txn, value).await?;
    let attached = match (cardinality, target) {
        (Cardinality::Single, target) => {
            handler.set_field(&txn, edit_id, field_name, target).await?;
            target
        }
        (Cardinality::Multi, Some(target)) => {
            handler
                .assoc_append(&txn, edit_id, field_name, target.target_id())
                .await?;
            Some(target)
        }
        (Cardinality::Multi, None) => {
            return Err(BlockError::UnsupportedCardinality(format!(
                "cannot remove from multi-valued field '{}'",
                field_name
            )))
        }
    };
    txn.commit().await?;
    log::info!(
        "wizard attached {:?} to {}.{} (content {})",
        attached,
        kind,
        field_name,
        edit_id
    );
    Ok(AttachOutcome {
        content_id: edit_id,
        attached,
    })
}

/// Move one association row up or down, marking the pending edit in the
/// same transaction. Returns the id of the row the change landed on.
pub async fn reorder_association(
    db: &DatabaseConnection,
    registry: &ContentRegistry,
    kind: &str,
    content_id: i32,
    field_name: &str,
    row_id: i32,
    direction: Direction,
) -> Result<i32, BlockError> {
    let handler = registry.get(kind)?;
    let field = lookup_field(handler.wizard_fields(), kind, field_name)?;
    if field.cardinality != Cardinality::Multi {
        return Err(BlockError::UnsupportedCardinality(format!(
            "field '{}' is single-valued, nothing to reorder",
            field_name
        )));
    }
    let txn = db.begin().await?;
    let edit_id = handler.set_pending_edit(&txn, content_id).await?;
    let row_id = if edit_id != content_id {
        // the shadow got fresh join rows; find the one mirroring the
        // requested row by (target, order)
        let original = handler
            .assoc_rows(&txn, content_id, field_name)
            .await?
            .into_iter()
            .find(|r| r.id == row_id)
            .ok_or_else(|| BlockError::NotFound(format!("association row {}", row_id)))?;
        handler
            .assoc_rows(&txn, edit_id, field_name)
            .await?
            .into_iter()
            .find(|r| r.target_id == original.target_id && r.order == original.order)
            .map(|r| r.id)
            .ok_or_else(|| BlockError::NotFound(format!("association row {}", row_id)))?
    } else {
        row_id
    };
    handler
        .assoc_move(&txn, edit_id, field_name, row_id, direction)
        .await?;
    txn.commit().await?;
    log::info!(
        "moved association row {} {} on {}.{} (content {})",
        row_id,
        direction.as_str(),
        kind,
        field_name,
        edit_id
    );
    Ok(edit_id)
}

fn lookup_field(
    fields: &'static [WizardField],
    kind: &str,
    field_name: &str,
) -> Result<WizardField, BlockError> {
    fields
        .iter()
        .find(|f| f.name == field_name)
        .copied()
        .ok_or_else(|| {
            BlockError::Configuration(format!(
                "content kind '{}' has no wizard field '{}'",
                kind, field_name
            ))
        })
}

/// Turn the wizard value into the reference to attach, creating link and
/// media rows as needed. The link sum type flattens to a row only here, at
/// the persistence boundary.
async fn resolve_target<C: ConnectionTrait>(
    db: &C,
    value: AttachValue,
) -> Result<Option<FieldRef>, BlockError> {
    match value {
        AttachValue::Remove => Ok(None),
        AttachValue::ExternalUrl(payload) => {
            payload.validate()?;
            let normalized = Url::parse(&payload.url)
                .map_err(|e| BlockError::Configuration(format!("unparseable url: {}", e)))?;
            let link_id = insert_link(
                db,
                &payload.title,
                LinkDestination::ExternalUrl {
                    url: normalized.to_string(),
                },
                None,
            )
            .await?;
            Ok(Some(FieldRef::Link(link_id)))
        }
        AttachValue::InternalPage { page_id } => {
            let page = pages::Entity::find()
                .filter(pages::Column::Id.eq(page_id))
                .filter(pages::Column::Deleted.eq(false))
                .one(db)
                .await?
                .ok_or_else(|| BlockError::NotFound(format!("page {}", page_id)))?;
            let link_id = insert_link(
                db,
                &page.name,
                LinkDestination::InternalPage { page_id },
                None,
            )
            .await?;
            Ok(Some(FieldRef::Link(link_id)))
        }
        AttachValue::UploadDocument {
            payload,
            category_id,
        } => {
            payload.validate()?;
            let now = Utc::now().naive_utc();
            let document = documents::ActiveModel {
                file_name: Set(payload.file_name),
                original_file_name: Set(payload.original_file_name),
                title: Set(payload.title.clone()),
                description: Set(payload.description),
                deleted: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            let link_id = insert_link(
                db,
                &payload.title,
                LinkDestination::Document {
                    document_id: document.id,
                },
                category_id,
            )
            .await?;
            Ok(Some(FieldRef::Link(link_id)))
        }
        AttachValue::ExistingDocument { document_id } => {
            let document = documents::Entity::find()
                .filter(documents::Column::Id.eq(document_id))
                .filter(documents::Column::Deleted.eq(false))
                .one(db)
                .await?
                .ok_or_else(|| BlockError::NotFound(format!("document {}", document_id)))?;
            let link_id = insert_link(
                db,
                &document.title,
                LinkDestination::Document { document_id },
                None,
            )
            .await?;
            Ok(Some(FieldRef::Link(link_id)))
        }
        AttachValue::UploadImage(payload) => {
            payload.validate()?;
            let now = Utc::now().naive_utc();
            let image = images::ActiveModel {
                file_name: Set(payload.file_name),
                title: Set(payload.title),
                category_id: Set(payload.category_id),
                deleted: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            Ok(Some(FieldRef::Image(image.id)))
        }
        AttachValue::ExistingImage { image_id } => {
            images::Entity::find()
                .filter(images::Column::Id.eq(image_id))
                .filter(images::Column::Deleted.eq(false))
                .one(db)
                .await?
                .ok_or_else(|| BlockError::NotFound(format!("image {}", image_id)))?;
            Ok(Some(FieldRef::Image(image_id)))
        }
    }
}

async fn insert_link<C: ConnectionTrait>(
    db: &C,
    title: &str,
    destination: LinkDestination,
    category_id: Option<i32>,
) -> Result<i32, BlockError> {
    let now = Utc::now().naive_utc();
    let (link_type, url, page_id, document_id) = links::flatten(destination);
    let link = links::ActiveModel {
        title: Set(title.to_string()),
        link_type: Set(link_type),
        url: Set(url),
        page_id: Set(page_id),
        document_id: Set(document_id),
        category_id: Set(category_id),
        deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(link.id)
}
