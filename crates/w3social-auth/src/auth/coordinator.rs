/*
[INPUT]:  Challenge and authenticate requests from the transport layer
[OUTPUT]: Session tokens with public identity fields, or a typed rejection
[POS]:    Auth layer - orchestrates nonce, recovery, identity, and token steps
[UPDATE]: When authentication flow steps or their ordering change
*/

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{
    EventSink, IdentityRepository, IdentityStore, NonceIssuer, NonceStore, NoopEventSink,
    SessionClaims, SessionToken, TokenIssuer,
};
use crate::clock::Clock;
use crate::config::{AuthConfig, ConfigError};
use crate::crypto::{SignatureRecoverer, personal_digest};
use crate::error::{AuthError, Result};
use crate::types::{
    Address, AuthEvent, IdentityUpdate, Nonce, PublicIdentity, SignedMessage, WalletSignature,
};

/// Where an address stands in the challenge/response exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    AwaitingNonce,
    AwaitingSignature,
    Authenticated,
    Rejected(AuthError),
}

impl AuthState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthState::Authenticated | AuthState::Rejected(_))
    }
}

/// Authenticate request as delivered by a transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub wallet_address: String,
    pub message: String,
    pub signature: String,
}

/// Successful authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutcome {
    pub token: SessionToken,
    pub identity: PublicIdentity,
    /// Whether this call created the identity
    pub created: bool,
}

/// One authenticate call moving through its states
#[derive(Debug)]
struct Attempt {
    address: Address,
    state: AuthState,
}

impl Attempt {
    fn start(address: Address) -> Self {
        Self {
            address,
            state: AuthState::AwaitingSignature,
        }
    }

    fn transition(&mut self, next: AuthState) {
        debug!(address = %self.address, from = ?self.state, to = ?next, "auth state");
        self.state = next;
    }

    fn reject(&mut self, err: AuthError) -> AuthError {
        warn!(address = %self.address, kind = err.kind(), "authentication rejected");
        self.transition(AuthState::Rejected(err.clone()));
        err
    }

    fn succeed(&mut self) {
        self.transition(AuthState::Authenticated);
    }
}

/// Entry point for external callers
#[derive(Debug, Clone)]
pub struct AuthCoordinator {
    nonces: NonceIssuer,
    recoverer: SignatureRecoverer,
    identities: IdentityStore,
    tokens: TokenIssuer,
    events: Arc<dyn EventSink>,
}

impl AuthCoordinator {
    /// Wire every component from configuration and persistence collaborators
    pub fn new(
        config: &AuthConfig,
        nonce_store: Arc<dyn NonceStore>,
        identity_repository: Arc<dyn IdentityRepository>,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let nonces = NonceIssuer::new(
            nonce_store,
            config.nonce_ttl(),
            config.challenge_prefix.clone(),
            clock.clone(),
        );
        let identities = IdentityStore::new(identity_repository, clock.clone());
        let tokens = TokenIssuer::new(
            config.token_key()?,
            config.token_ttl(),
            config.issuer.clone(),
            clock,
        );

        Ok(Self::from_parts(
            nonces,
            SignatureRecoverer::new(config.signature_policy),
            identities,
            tokens,
        ))
    }

    pub fn from_parts(
        nonces: NonceIssuer,
        recoverer: SignatureRecoverer,
        identities: IdentityStore,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            nonces,
            recoverer,
            identities,
            tokens,
            events: Arc::new(NoopEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn nonce_issuer(&self) -> &NonceIssuer {
        &self.nonces
    }

    pub fn identity_store(&self) -> &IdentityStore {
        &self.identities
    }

    pub fn token_issuer(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Issue the challenge the wallet must sign
    pub async fn request_challenge(&self, address: &Address) -> Result<Nonce> {
        let nonce = self.nonces.issue(address).await?;
        info!(
            address = %address,
            expires_at = %nonce.expires_at,
            "challenge issued"
        );
        Ok(nonce)
    }

    /// Current position of `address` before any authenticate call
    pub async fn challenge_state(&self, address: &Address) -> Result<AuthState> {
        match self.nonces.live(address).await {
            Ok(_) => Ok(AuthState::AwaitingSignature),
            Err(AuthError::NonceInvalid) => Ok(AuthState::AwaitingNonce),
            Err(err) => Err(err),
        }
    }

    /// Prove control of `address` by a signature over a message carrying the live nonce
    ///
    /// 1. The message must embed the live nonce for `address`.
    /// 2. The signature must recover to `address`.
    /// 3. The nonce is consumed; a concurrent replay loses here.
    /// 4. The identity is fetched or created.
    /// 5. A session token is minted.
    ///
    /// Nothing is created or minted unless every earlier step succeeded.
    pub async fn authenticate(
        &self,
        address: &Address,
        message: &str,
        signature: &WalletSignature,
    ) -> Result<AuthOutcome> {
        let mut attempt = Attempt::start(*address);

        let nonce = match self.nonces.live(address).await {
            Ok(nonce) if nonce.is_embedded_in(message) => nonce,
            Ok(_) => return Err(attempt.reject(AuthError::NonceInvalid)),
            Err(err) => return Err(attempt.reject(err)),
        };

        let digest = personal_digest(message);
        match self.recoverer.recover(&digest, signature) {
            Ok(recovered) if recovered == *address => {}
            Ok(recovered) => {
                debug!(address = %address, recovered = %recovered, "recovered address mismatch");
                return Err(attempt.reject(AuthError::InvalidSignature));
            }
            Err(err) => return Err(attempt.reject(err)),
        }

        if let Err(err) = self.nonces.consume(address, &nonce.value).await {
            return Err(attempt.reject(err));
        }

        let provisioned = match self.identities.get_or_create(address).await {
            Ok(provisioned) => provisioned,
            Err(err) => return Err(attempt.reject(err)),
        };
        let created = provisioned.is_created();
        let identity = provisioned.into_identity();

        let token = self.tokens.mint(&identity);
        attempt.succeed();

        info!(
            address = %address,
            created,
            expires_at = %token.expires_at(),
            "authenticated"
        );

        if created {
            self.events
                .publish(AuthEvent::IdentityCreated {
                    address: identity.address,
                    id: identity.id,
                })
                .await;
        }
        self.events
            .publish(AuthEvent::Authenticated {
                address: identity.address,
            })
            .await;

        Ok(AuthOutcome {
            token,
            identity: identity.to_public(),
            created,
        })
    }

    pub async fn authenticate_signed(
        &self,
        address: &Address,
        signed: &SignedMessage,
    ) -> Result<AuthOutcome> {
        self.authenticate(address, &signed.message, &signed.signature)
            .await
    }

    /// Authenticate from transport strings
    ///
    /// A malformed address cannot match any recovered signer, so it is
    /// rejected as `InvalidSignature` along with a malformed signature.
    pub async fn authenticate_request(&self, request: &AuthRequest) -> Result<AuthOutcome> {
        let address: Address = match request.wallet_address.parse() {
            Ok(address) => address,
            Err(_) => {
                warn!(kind = "invalid_signature", "authentication rejected: malformed address");
                return Err(AuthError::InvalidSignature);
            }
        };

        let signature = match WalletSignature::from_hex(&request.signature) {
            Ok(signature) => signature,
            Err(err) => {
                return Err(Attempt::start(address).reject(err));
            }
        };

        self.authenticate(&address, &request.message, &signature)
            .await
    }

    /// Verify a session token for downstream consumers
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims> {
        self.tokens.verify(token)
    }

    /// Public fields of the identity at `address`
    pub async fn profile(&self, address: &Address) -> Result<PublicIdentity> {
        Ok(self.identities.get(address).await?.to_public())
    }

    /// Apply a profile edit to the token holder's own identity
    pub async fn update_profile(
        &self,
        token: &str,
        update: &IdentityUpdate,
    ) -> Result<PublicIdentity> {
        let claims = self.tokens.verify(token)?;
        let identity = self.identities.update(&claims.address, update).await?;

        info!(address = %claims.address, "profile updated");
        self.events
            .publish(AuthEvent::ProfileUpdated {
                address: claims.address,
            })
            .await;

        Ok(identity.to_public())
    }
}
