use bson::oid::ObjectId;

use crate::{
    audit::audit_best_effort,
    dto::address::{AddressBookDto, AddressDto, AddressRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, AddressBook, AddressEdit, AddressSlot},
    response::{ApiResponse, Meta},
    routes::params::parse_object_id,
    state::AppState,
};

/// Fills the first free slot (home, then work). A user holds at most two.
pub async fn add_address(
    state: &AppState,
    caller: &AuthUser,
    user_id: &str,
    payload: AddressRequest,
) -> AppResult<ApiResponse<AddressDto>> {
    let user_id = parse_object_id(user_id)?;
    caller.ensure_owner(user_id)?;
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    if user.address.count() >= AddressBook::CAPACITY {
        return Err(AppError::BadRequest("not allowed".into()));
    }

    let address = AddressEdit::from(payload).into_address();
    for slot in AddressSlot::ALL {
        if user.address.get(slot).is_some() {
            continue;
        }
        // Conditional on the slot still being empty, so two concurrent adds
        // cannot both take the same slot.
        let filled = state.store.fill_address_slot(user_id, slot, &address).await?;
        if filled || slot_holds(state, user_id, slot, &address).await? {
            tracing::info!(user_id = %user_id, slot = slot.field(), "address added");
            audit_best_effort(
                state.store.as_ref(),
                Some(&caller.uid),
                "address_add",
                Some("users"),
                Some(serde_json::json!({ "user_id": user_id.to_hex(), "slot": slot.field() })),
            )
            .await;
            return Ok(ApiResponse::success(
                "Successfully added address",
                AddressDto::from(address),
                Some(Meta::empty()),
            ));
        }
    }

    Err(AppError::BadRequest("not allowed".into()))
}

/// Whether `slot` already holds this exact address. A fill whose
/// acknowledgement was lost reports a guard miss even though it applied.
async fn slot_holds(
    state: &AppState,
    user_id: ObjectId,
    slot: AddressSlot,
    address: &Address,
) -> AppResult<bool> {
    let user = state.store.find_user(user_id).await?;
    Ok(user
        .and_then(|user| user.address.get(slot).map(|held| held.address_id))
        .is_some_and(|held| held == address.address_id))
}

pub async fn edit_home_address(
    state: &AppState,
    caller: &AuthUser,
    user_id: &str,
    payload: AddressRequest,
) -> AppResult<ApiResponse<AddressBookDto>> {
    edit_address(state, caller, user_id, AddressSlot::Home, payload).await
}

pub async fn edit_work_address(
    state: &AppState,
    caller: &AuthUser,
    user_id: &str,
    payload: AddressRequest,
) -> AppResult<ApiResponse<AddressBookDto>> {
    edit_address(state, caller, user_id, AddressSlot::Work, payload).await
}

async fn edit_address(
    state: &AppState,
    caller: &AuthUser,
    user_id: &str,
    slot: AddressSlot,
    payload: AddressRequest,
) -> AppResult<ApiResponse<AddressBookDto>> {
    let user_id = parse_object_id(user_id)?;
    caller.ensure_owner(user_id)?;
    let edit = AddressEdit::from(payload);
    if edit.is_empty() {
        return Err(AppError::BadRequest("no address fields given".into()));
    }

    if !state.store.edit_address_slot(user_id, slot, &edit).await? {
        // Either the user is gone or the slot was never filled.
        return match state.store.find_user(user_id).await? {
            None => Err(AppError::NotFound("user not found".into())),
            Some(_) => Err(AppError::NotFound(format!("no {} address", slot.field()))),
        };
    }

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    audit_best_effort(
        state.store.as_ref(),
        Some(&caller.uid),
        "address_edit",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id.to_hex(), "slot": slot.field() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully updated address",
        AddressBookDto::from(user.address),
        Some(Meta::empty()),
    ))
}

/// Removes both addresses. Deleting an already empty book succeeds.
pub async fn delete_address(
    state: &AppState,
    caller: &AuthUser,
    user_id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user_id = parse_object_id(user_id)?;
    caller.ensure_owner(user_id)?;
    if !state.store.clear_addresses(user_id).await? {
        return Err(AppError::NotFound("user not found".into()));
    }

    audit_best_effort(
        state.store.as_ref(),
        Some(&caller.uid),
        "address_delete",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id.to_hex() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
