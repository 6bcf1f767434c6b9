//! Typed persistence of clients, users, grants and tokens.

use crate::credentials::BasicAuth;
use crate::error::EngineError;
use crate::models::{
    key, Client, Grant, Record, Token, User, CLIENT_PREFIX, GRANT_ACCESS_PREFIX, GRANT_PREFIX,
    GRANT_REFRESH_PREFIX, TOKEN_PREFIX, USER_PREFIX,
};
use crate::password::{hash_secret, verify_secret};
use crate::random::generate_code;
use crate::store::KvStore;
use chrono::Utc;
use log::{debug, info};

const MAX_UPDATE_ATTEMPTS: usize = 16;
const CLIENT_ID_LENGTH: usize = 16;

pub struct Repository<S> {
    store: S,
}

impl<S: KvStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads a live record together with its raw bytes
    async fn load_raw<T: Record>(&self, key: &[u8]) -> Result<(T, Vec<u8>), EngineError> {
        let raw = self.store.get(key).await?.ok_or(EngineError::NotFound)?;
        let record: T = serde_json::from_slice(&raw)?;
        if record.is_deleted() {
            return Err(EngineError::NotFound);
        }
        Ok((record, raw))
    }

    async fn load<T: Record>(&self, key: &[u8]) -> Result<T, EngineError> {
        self.load_raw(key).await.map(|(record, _)| record)
    }

    async fn put<T: Record>(&self, key: &[u8], record: &T) -> Result<(), EngineError> {
        let bytes = serde_json::to_vec(record)?;
        self.store.set(key, &bytes).await?;
        Ok(())
    }

    /// Read-modify-write of a live record, retried until the swap lands
    async fn update<T, F>(&self, key: &[u8], mut apply: F) -> Result<T, EngineError>
    where
        T: Record,
        F: FnMut(&mut T) + Send,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let (mut record, raw) = self.load_raw::<T>(key).await?;
            apply(&mut record);
            record.set_updated_at(Utc::now());
            let bytes = serde_json::to_vec(&record)?;
            if self.store.compare_and_swap(key, Some(&raw), &bytes).await? {
                return Ok(record);
            }
            debug!(
                "Concurrent update of {}, retrying (attempt {attempt})",
                String::from_utf8_lossy(key)
            );
        }
        Err(EngineError::Contention(
            String::from_utf8_lossy(key).into_owned(),
        ))
    }

    pub async fn client(&self, id: &str) -> Result<Client, EngineError> {
        self.load(&key(CLIENT_PREFIX, id)).await
    }

    pub async fn user(&self, email: &str) -> Result<User, EngineError> {
        self.load(&key(USER_PREFIX, email)).await
    }

    pub async fn grant(&self, code: &str) -> Result<Grant, EngineError> {
        self.load(&key(GRANT_PREFIX, code)).await
    }

    pub async fn grant_by_access(&self, token: &str) -> Result<Grant, EngineError> {
        self.load(&key(GRANT_ACCESS_PREFIX, token)).await
    }

    pub async fn grant_by_refresh(&self, token: &str) -> Result<Grant, EngineError> {
        self.load(&key(GRANT_REFRESH_PREFIX, token)).await
    }

    pub async fn token(&self, code: &str) -> Result<Token, EngineError> {
        self.load(&key(TOKEN_PREFIX, code)).await
    }

    /// A grant the client owns. Unlisted codes are `Ownership` failures.
    pub async fn grant_by_client(&self, client: &Client, code: &str) -> Result<Grant, EngineError> {
        if !client.owns_grant(code) {
            return Err(EngineError::Ownership);
        }
        self.grant(code).await
    }

    pub async fn save_client(&self, client: &mut Client) -> Result<(), EngineError> {
        client.updated_at = Utc::now();
        self.put(&key(CLIENT_PREFIX, &client.id), client).await
    }

    pub async fn save_user(&self, user: &mut User) -> Result<(), EngineError> {
        user.updated_at = Utc::now();
        self.put(&key(USER_PREFIX, &user.email), user).await
    }

    pub async fn save_token(&self, token: &mut Token) -> Result<(), EngineError> {
        token.updated_at = Utc::now();
        self.put(&key(TOKEN_PREFIX, &token.code), token).await
    }

    /// Persists a grant under its code and every token index it carries
    pub async fn save_grant(&self, grant: &mut Grant) -> Result<(), EngineError> {
        grant.updated_at = Utc::now();
        let bytes = serde_json::to_vec(grant)?;
        if !grant.access_token.is_empty() {
            self.store
                .set(&key(GRANT_ACCESS_PREFIX, &grant.access_token), &bytes)
                .await?;
        }
        if !grant.refresh_token.is_empty() {
            self.store
                .set(&key(GRANT_REFRESH_PREFIX, &grant.refresh_token), &bytes)
                .await?;
        }
        self.store.set(&key(GRANT_PREFIX, &grant.code), &bytes).await?;
        Ok(())
    }

    /// Appends grant and token codes to the membership lists of the client
    /// and, when it exists, the user.
    pub async fn attach(
        &self,
        client_id: &str,
        user_id: &str,
        grants: &[&str],
        tokens: &[&str],
    ) -> Result<(), EngineError> {
        let append = |grant_list: &mut Vec<String>, token_list: &mut Vec<String>| {
            grant_list.extend(grants.iter().map(|g| g.to_string()));
            token_list.extend(tokens.iter().map(|t| t.to_string()));
        };

        self.update::<Client, _>(&key(CLIENT_PREFIX, client_id), |client| {
            append(&mut client.grants, &mut client.tokens)
        })
        .await?;

        if user_id.is_empty() {
            return Ok(());
        }
        match self
            .update::<User, _>(&key(USER_PREFIX, user_id), |user| {
                append(&mut user.grants, &mut user.tokens)
            })
            .await
        {
            Ok(_) | Err(EngineError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Removes grant and token codes from the membership lists of the client
    /// and the user. Missing owners are skipped.
    pub async fn detach(
        &self,
        client_id: &str,
        user_id: &str,
        codes: &[&str],
    ) -> Result<(), EngineError> {
        let prune = |grant_list: &mut Vec<String>, token_list: &mut Vec<String>| {
            grant_list.retain(|g| !codes.contains(&g.as_str()));
            token_list.retain(|t| !codes.contains(&t.as_str()));
        };

        match self
            .update::<Client, _>(&key(CLIENT_PREFIX, client_id), |client| {
                prune(&mut client.grants, &mut client.tokens)
            })
            .await
        {
            Ok(_) | Err(EngineError::NotFound) => {}
            Err(err) => return Err(err),
        }

        if user_id.is_empty() {
            return Ok(());
        }
        match self
            .update::<User, _>(&key(USER_PREFIX, user_id), |user| {
                prune(&mut user.grants, &mut user.tokens)
            })
            .await
        {
            Ok(_) | Err(EngineError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Soft-deletes a token. Already revoked tokens are left alone.
    pub async fn revoke_token(&self, code: &str) -> Result<(), EngineError> {
        let token_key = key(TOKEN_PREFIX, code);
        let mut token = match self.load::<Token>(&token_key).await {
            Ok(token) => token,
            Err(EngineError::NotFound) => return Ok(()),
            Err(err) => return Err(err),
        };
        let now = Utc::now();
        token.deleted_at = Some(now);
        token.updated_at = now;
        self.put(&token_key, &token).await
    }

    /// Atomically marks the grant under `code` as exchanged, then drops its
    /// token indexes, revokes its tokens and detaches it from its owners.
    ///
    /// Exactly one caller wins for a given code; the others get
    /// `GrantClaimed` (or `NotFound` once the retirement is visible).
    pub async fn retire_grant(&self, code: &str) -> Result<Grant, EngineError> {
        let grant_key = key(GRANT_PREFIX, code);
        let (mut grant, raw) = self.load_raw::<Grant>(&grant_key).await?;

        let now = Utc::now();
        grant.deleted_at = Some(now);
        grant.updated_at = now;
        let bytes = serde_json::to_vec(&grant)?;
        if !self
            .store
            .compare_and_swap(&grant_key, Some(&raw), &bytes)
            .await?
        {
            return Err(EngineError::GrantClaimed);
        }

        if !grant.access_token.is_empty() {
            self.store
                .remove(&key(GRANT_ACCESS_PREFIX, &grant.access_token))
                .await?;
            self.revoke_token(&grant.access_token).await?;
        }
        if !grant.refresh_token.is_empty() {
            self.store
                .remove(&key(GRANT_REFRESH_PREFIX, &grant.refresh_token))
                .await?;
            self.revoke_token(&grant.refresh_token).await?;
        }
        let retired: Vec<&str> = [
            grant.code.as_str(),
            grant.access_token.as_str(),
            grant.refresh_token.as_str(),
        ]
        .into_iter()
        .filter(|code| !code.is_empty())
        .collect();
        self.detach(&grant.client_id, &grant.user_id, &retired)
            .await?;
        debug!("Retired grant of client {}", grant.client_id);
        Ok(grant)
    }

    pub async fn register_user(&self, email: &str, password: &str) -> Result<User, EngineError> {
        let now = Utc::now();
        let mut user = User {
            email: email.to_string(),
            grants: Vec::new(),
            tokens: Vec::new(),
            clients: Vec::new(),
            password: hash_secret(password)?,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.save_user(&mut user).await?;
        info!("Registered user {email}");
        Ok(user)
    }

    /// Registers a client for `owner` with a generated id
    pub async fn register_client(
        &self,
        owner: &str,
        name: &str,
        secret: &str,
        redirect_url: &str,
    ) -> Result<Client, EngineError> {
        let id = generate_code(CLIENT_ID_LENGTH)?;
        self.register_client_with_id(&id, owner, name, secret, redirect_url)
            .await
    }

    pub async fn register_client_with_id(
        &self,
        id: &str,
        owner: &str,
        name: &str,
        secret: &str,
        redirect_url: &str,
    ) -> Result<Client, EngineError> {
        let now = Utc::now();
        let mut client = Client {
            id: id.to_string(),
            user_id: owner.to_string(),
            name: name.to_string(),
            secret: hash_secret(secret)?,
            grants: Vec::new(),
            tokens: Vec::new(),
            redirect_url: redirect_url.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.save_client(&mut client).await?;

        let client_id = client.id.clone();
        match self
            .update::<User, _>(&key(USER_PREFIX, owner), |user| {
                user.clients.push(client_id.clone())
            })
            .await
        {
            Ok(_) | Err(EngineError::NotFound) => {}
            Err(err) => return Err(err),
        }
        info!("Registered client {} for {owner}", client.id);
        Ok(client)
    }

    /// Checks a user's password
    pub async fn verify_user(&self, email: &str, password: &str) -> Result<User, EngineError> {
        let user = self.user(email).await?;
        verify_secret(&user.password, password)?;
        Ok(user)
    }

    /// Authenticates a client by id and secret
    pub async fn verify_client(&self, auth: &BasicAuth) -> Result<Client, EngineError> {
        let client = self.client(&auth.username).await?;
        verify_secret(&client.secret, &auth.password)?;
        Ok(client)
    }
}
