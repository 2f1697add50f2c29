//! `PostgreSQL` user, address and bank account storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{
    AddressId, BankAccountId, Email, PhoneNumber, Role, UserId, VerificationCode,
};

use super::{PgStore, RepositoryError, UserStore, map_constraint};
use crate::models::{
    Address, AddressPatch, BankAccount, NewProfileRecord, NewUser, PendingCode, SellerUpgrade,
    User, UserPatch,
};

macro_rules! user_columns {
    () => {
        "id, email, phone, role, verified, code, code_expires_at, first_name, last_name, \
         created_at, updated_at"
    };
}

macro_rules! address_columns {
    () => {
        "id, user_id, line1, line2, city, post_code, country"
    };
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    phone: String,
    role: Role,
    verified: bool,
    code: Option<i32>,
    code_expires_at: Option<DateTime<Utc>>,
    first_name: Option<String>,
    last_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    user_id: UserId,
    line1: String,
    line2: Option<String>,
    city: String,
    post_code: String,
    country: String,
}

#[derive(sqlx::FromRow)]
struct BankAccountRow {
    id: BankAccountId,
    user_id: UserId,
    account_number: String,
    swift_code: String,
    payment_type: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = PhoneNumber::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;

        let pending_code = match (row.code, row.code_expires_at) {
            (Some(code), Some(expires_at)) => {
                let code = u32::try_from(code)
                    .ok()
                    .and_then(VerificationCode::new)
                    .ok_or_else(|| {
                        RepositoryError::DataCorruption(format!(
                            "invalid verification code in database for user {}",
                            row.id
                        ))
                    })?;
                Some(PendingCode { code, expires_at })
            }
            _ => None,
        };

        Ok(Self {
            id: row.id,
            email,
            phone,
            role: row.role,
            verified: row.verified,
            pending_code,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            line1: row.line1,
            line2: row.line2,
            city: row.city,
            post_code: row.post_code,
            country: row.country,
        }
    }
}

impl From<BankAccountRow> for BankAccount {
    fn from(row: BankAccountRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            account_number: row.account_number,
            swift_code: row.swift_code,
            payment_type: row.payment_type,
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO users (email, password_hash, phone) VALUES ($1, $2, $3) RETURNING ",
            user_columns!()
        ))
        .bind(new.email.as_str())
        .bind(&new.password_hash)
        .bind(new.phone.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_constraint(e, "email"))?;

        row.try_into()
    }

    async fn find_user_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, LoginRow>(concat!(
            "SELECT password_hash, ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET first_name = COALESCE($2, first_name), ",
            "last_name = COALESCE($3, last_name), ",
            "updated_at = now() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn set_verification_code(
        &self,
        id: UserId,
        code: VerificationCode,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET code = $2, code_expires_at = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(code.as_i32())
        .bind(expires_at)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET verified = TRUE, code = NULL, code_expires_at = NULL, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn create_profile(
        &self,
        user_id: UserId,
        profile: NewProfileRecord,
    ) -> Result<(User, Address), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let address = sqlx::query_as::<_, AddressRow>(concat!(
            "INSERT INTO addresses (user_id, line1, line2, city, post_code, country) ",
            "VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            address_columns!()
        ))
        .bind(user_id)
        .bind(profile.address.line1)
        .bind(profile.address.line2)
        .bind(profile.address.city)
        .bind(profile.address.post_code)
        .bind(profile.address.country)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "address"))?;

        let user = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET first_name = $2, last_name = $3, updated_at = now() ",
            "WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(user_id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok((user.try_into()?, address.into()))
    }

    async fn find_address(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(concat!(
            "SELECT ",
            address_columns!(),
            " FROM addresses WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Address::from))
    }

    async fn update_address(
        &self,
        user_id: UserId,
        patch: AddressPatch,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(concat!(
            "UPDATE addresses SET line1 = COALESCE($2, line1), line2 = COALESCE($3, line2), ",
            "city = COALESCE($4, city), post_code = COALESCE($5, post_code), ",
            "country = COALESCE($6, country), updated_at = now() ",
            "WHERE user_id = $1 RETURNING ",
            address_columns!()
        ))
        .bind(user_id)
        .bind(patch.line1)
        .bind(patch.line2)
        .bind(patch.city)
        .bind(patch.post_code)
        .bind(patch.country)
        .fetch_optional(self.pool())
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn upgrade_to_seller(
        &self,
        id: UserId,
        upgrade: SellerUpgrade,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // The role guard makes a concurrent second upgrade a no-op.
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET first_name = $2, last_name = $3, phone = $4, ",
            "role = 'seller', updated_at = now() ",
            "WHERE id = $1 AND role = 'buyer' RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(&upgrade.first_name)
        .bind(&upgrade.last_name)
        .bind(upgrade.phone.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("user is not a buyer".to_owned()))?;

        sqlx::query(
            r"
            INSERT INTO bank_accounts (user_id, account_number, swift_code, payment_type)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(id)
        .bind(&upgrade.bank_account.account_number)
        .bind(&upgrade.bank_account.swift_code)
        .bind(&upgrade.bank_account.payment_type)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "bank account"))?;

        tx.commit().await?;

        row.try_into()
    }

    async fn find_bank_account(
        &self,
        user_id: UserId,
    ) -> Result<Option<BankAccount>, RepositoryError> {
        let row = sqlx::query_as::<_, BankAccountRow>(
            r"
            SELECT id, user_id, account_number, swift_code, payment_type
            FROM bank_accounts
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(BankAccount::from))
    }
}
