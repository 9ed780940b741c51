use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::{DatabaseConnection, IntoActiveModel, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{hash_password, verify_password, AuthService},
    entities::{
        address, bank_account,
        user::{self, UserRole},
    },
    errors::{is_unique_violation, ServiceError},
    notifications::{verification_message, SmsSender},
    repositories::UserRepository,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupInput {
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyCodeInput {
    #[validate(range(min = 100000, max = 999999))]
    pub code: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 255))]
    pub address_line1: String,
    #[validate(length(max = 255))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub post_code: String,
    #[validate(length(min = 2, max = 100))]
    pub country: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProfileInput {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate]
    pub address: AddressInput,
}

/// Partial profile update. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address_line1: Option<String>,
    #[validate(length(max = 255))]
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub post_code: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub country: Option<String>,
}

impl UpdateProfileInput {
    fn touches_address(&self) -> bool {
        self.address_line1.is_some()
            || self.address_line2.is_some()
            || self.city.is_some()
            || self.post_code.is_some()
            || self.country.is_some()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BecomeSellerInput {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(length(min = 4, max = 34))]
    pub account_number: String,
    #[validate(length(min = 8, max = 11))]
    pub swift_code: String,
    #[validate(length(min = 1, max = 50))]
    pub payment_type: String,
}

/// Public view of a user; never carries the password hash or pending code.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub verified: bool,
    pub address: Option<address::Model>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    fn new(user: user::Model, address: Option<address::Model>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            verified: user.verified,
            address,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthToken {
    pub token: String,
    pub user: UserProfile,
}

/// Account lifecycle: signup, login, phone verification, profile and the
/// buyer to seller upgrade.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    sms: Arc<dyn SmsSender>,
    code_ttl: Duration,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        sms: Arc<dyn SmsSender>,
        code_ttl: std::time::Duration,
    ) -> Self {
        Self {
            db,
            auth,
            sms,
            code_ttl: Duration::from_std(code_ttl).unwrap_or_else(|_| Duration::minutes(30)),
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn signup(&self, input: SignupInput) -> Result<AuthToken, ServiceError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if UserRepository::find_by_email(&*self.db, &email).await?.is_some() {
            return Err(ServiceError::Conflict("email already registered".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            first_name: Set(None),
            last_name: Set(None),
            phone: Set(input.phone),
            role: Set(UserRole::Buyer),
            verified: Set(false),
            verification_code: Set(None),
            code_expires_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let user = UserRepository::insert(&*self.db, model)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    ServiceError::Conflict("email already registered".to_string())
                } else {
                    ServiceError::DatabaseError(err)
                }
            })?;

        info!(user_id = %user.id, "user registered");
        self.issue_token(user, None)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthToken, ServiceError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let user = UserRepository::find_by_email(&*self.db, &email)
            .await?
            .ok_or_else(|| ServiceError::NotFound("user not found".to_string()))?;

        if !verify_password(&input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(ServiceError::Unauthorized(
                "invalid email or password".to_string(),
            ));
        }

        let address = UserRepository::find_address(&*self.db, user.id).await?;
        self.issue_token(user, address)
    }

    /// Creates a fresh six-digit code and texts it to the user's phone.
    /// Returns when the code stops being accepted.
    #[instrument(skip(self))]
    pub async fn request_verification_code(
        &self,
        user_id: Uuid,
    ) -> Result<DateTime<Utc>, ServiceError> {
        let user = self.load_user(user_id).await?;
        if user.verified {
            return Err(ServiceError::Conflict("user already verified".to_string()));
        }
        let phone = user.phone.clone().ok_or_else(|| {
            ServiceError::ValidationError("a phone number is required for verification".to_string())
        })?;

        let code = generate_verification_code();
        let now = Utc::now();
        let expires_at = now + self.code_ttl;
        let mut active = user.into_active_model();
        active.verification_code = Set(Some(code));
        active.code_expires_at = Set(Some(expires_at));
        active.updated_at = Set(now);
        UserRepository::update(&*self.db, active).await?;

        self.sms.send(&phone, &verification_message(code)).await?;
        info!(user_id = %user_id, "verification code sent");
        Ok(expires_at)
    }

    pub async fn verify_code(
        &self,
        user_id: Uuid,
        input: VerifyCodeInput,
    ) -> Result<UserProfile, ServiceError> {
        self.verify_code_at(user_id, input, Utc::now()).await
    }

    /// Checks `input.code` against the stored code as of `now`.
    #[instrument(skip(self, input))]
    pub async fn verify_code_at(
        &self,
        user_id: Uuid,
        input: VerifyCodeInput,
        now: DateTime<Utc>,
    ) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let user = self.load_user(user_id).await?;
        if user.verified {
            return Err(ServiceError::Conflict("user already verified".to_string()));
        }

        if user.verification_code != Some(input.code) {
            return Err(ServiceError::InvalidOperation(
                "verification code does not match".to_string(),
            ));
        }
        match user.code_expires_at {
            Some(expires_at) if now < expires_at => {}
            _ => {
                return Err(ServiceError::InvalidOperation(
                    "verification code expired".to_string(),
                ))
            }
        }

        let mut active = user.into_active_model();
        active.verified = Set(true);
        active.verification_code = Set(None);
        active.code_expires_at = Set(None);
        active.updated_at = Set(now);
        let user = UserRepository::update(&*self.db, active).await?;

        info!(user_id = %user_id, "phone verified");
        let address = UserRepository::find_address(&*self.db, user_id).await?;
        Ok(UserProfile::new(user, address))
    }

    #[instrument(skip(self, input))]
    pub async fn create_profile(
        &self,
        user_id: Uuid,
        input: CreateProfileInput,
    ) -> Result<UserProfile, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let user = UserRepository::find_by_id(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user_id))?;
        if UserRepository::find_address(&txn, user_id).await?.is_some() {
            return Err(ServiceError::Conflict("profile already exists".to_string()));
        }

        let now = Utc::now();
        let mut active = user.into_active_model();
        active.first_name = Set(Some(input.first_name));
        active.last_name = Set(Some(input.last_name));
        active.updated_at = Set(now);
        let user = UserRepository::update(&txn, active).await?;

        let address =
            UserRepository::save_address(&txn, new_address(user_id, input.address, now)).await?;
        txn.commit().await?;

        info!(user_id = %user_id, "profile created");
        Ok(UserProfile::new(user, Some(address)))
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        let user = self.load_user(user_id).await?;
        let address = UserRepository::find_address(&*self.db, user_id).await?;
        Ok(UserProfile::new(user, address))
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<UserProfile, ServiceError> {
        input.validate()?;
        let now = Utc::now();

        let txn = self.db.begin().await?;
        let mut user = UserRepository::find_by_id(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user_id))?;

        if input.first_name.is_some() || input.last_name.is_some() {
            let mut active = user.into_active_model();
            if let Some(first_name) = input.first_name.clone() {
                active.first_name = Set(Some(first_name));
            }
            if let Some(last_name) = input.last_name.clone() {
                active.last_name = Set(Some(last_name));
            }
            active.updated_at = Set(now);
            user = UserRepository::update(&txn, active).await?;
        }

        let mut address = UserRepository::find_address(&txn, user_id).await?;
        if input.touches_address() {
            let model = match address.take() {
                Some(existing) => {
                    let mut active = existing.into_active_model();
                    if let Some(line1) = input.address_line1 {
                        active.address_line1 = Set(line1);
                    }
                    if let Some(line2) = input.address_line2 {
                        active.address_line2 = Set(Some(line2));
                    }
                    if let Some(city) = input.city {
                        active.city = Set(city);
                    }
                    if let Some(post_code) = input.post_code {
                        active.post_code = Set(post_code);
                    }
                    if let Some(country) = input.country {
                        active.country = Set(country);
                    }
                    active.updated_at = Set(now);
                    active
                }
                None => new_address(user_id, address_from_update(input)?, now),
            };
            address = Some(UserRepository::save_address(&txn, model).await?);
        }

        txn.commit().await?;
        info!(user_id = %user_id, "profile updated");
        Ok(UserProfile::new(user, address))
    }

    /// Upgrades a buyer to seller and registers the payout account in one
    /// transaction, then returns a token carrying the new role.
    #[instrument(skip(self, input))]
    pub async fn become_seller(
        &self,
        user_id: Uuid,
        input: BecomeSellerInput,
    ) -> Result<AuthToken, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let user = UserRepository::find_by_id(&txn, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user_id))?;
        if user.role == UserRole::Seller {
            return Err(ServiceError::Conflict("user is already a seller".to_string()));
        }

        let now = Utc::now();
        let mut active = user.into_active_model();
        active.first_name = Set(Some(input.first_name));
        active.last_name = Set(Some(input.last_name));
        active.phone = Set(Some(input.phone));
        active.role = Set(UserRole::Seller);
        active.updated_at = Set(now);
        let user = UserRepository::update(&txn, active).await?;

        UserRepository::insert_bank_account(
            &txn,
            bank_account::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                account_number: Set(input.account_number),
                swift_code: Set(input.swift_code),
                payment_type: Set(input.payment_type),
                created_at: Set(now),
            },
        )
        .await?;

        let address = UserRepository::find_address(&txn, user_id).await?;
        txn.commit().await?;

        info!(user_id = %user_id, "user upgraded to seller");
        self.issue_token(user, address)
    }

    async fn load_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        UserRepository::find_by_id(&*self.db, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", user_id))
    }

    fn issue_token(
        &self,
        user: user::Model,
        address: Option<address::Model>,
    ) -> Result<AuthToken, ServiceError> {
        let token = self.auth.generate_token(&user)?;
        Ok(AuthToken {
            token,
            user: UserProfile::new(user, address),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_verification_code() -> i32 {
    rand::thread_rng().gen_range(100_000..1_000_000)
}

fn new_address(user_id: Uuid, input: AddressInput, now: DateTime<Utc>) -> address::ActiveModel {
    address::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        address_line1: Set(input.address_line1),
        address_line2: Set(input.address_line2),
        city: Set(input.city),
        post_code: Set(input.post_code),
        country: Set(input.country),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn address_from_update(input: UpdateProfileInput) -> Result<AddressInput, ServiceError> {
    match (input.address_line1, input.city, input.post_code, input.country) {
        (Some(address_line1), Some(city), Some(post_code), Some(country)) => Ok(AddressInput {
            address_line1,
            address_line2: input.address_line2,
            city,
            post_code,
            country,
        }),
        _ => Err(ServiceError::ValidationError(
            "address_line1, city, post_code and country are required to create an address"
                .to_string(),
        )),
    }
}
