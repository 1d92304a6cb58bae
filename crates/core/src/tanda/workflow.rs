//! Transactional tanda operations.
//!
//! Every mutating operation runs in one unit of work and appends one
//! business audit entry named after the operation. Any error rolls back
//! the whole operation, audit entry included.

use tandas_shared::Actor;
use tandas_shared::types::{ParticipantId, TandaId};
use tracing::info;

use super::draw::TurnDraw;
use super::service::TandaService;
use super::types::{
    CreateTandaRequest, ParticipantStatus, Tanda, TandaDetail, TandaListItem, TandaParticipant,
    TandaSummary, Turn,
};
use crate::audit::{AuditSeverity, actions};
use crate::error::WorkflowError;
use crate::persistence::{Record, Repository, UnitOfWork, Visibility};

/// Tanda lifecycle operations.
#[derive(Debug, Clone)]
pub struct TandaWorkflow {
    repo: Repository,
}

impl TandaWorkflow {
    /// Creates the workflow over a repository.
    #[must_use]
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Creates a tanda in Draft.
    ///
    /// Validation happens before any transaction opens, so a rejected
    /// request persists nothing.
    pub async fn create_tanda(
        &self,
        request: CreateTandaRequest,
        actor: Actor,
    ) -> Result<TandaSummary, WorkflowError> {
        let terms = TandaService::validate_create(&request)?;
        let name = request.name.trim().to_string();
        let amount = request.amount_per_person;

        let tanda = self
            .repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let tanda = Tanda::draft(name, amount, terms, uow.now());
                    uow.insert(tanda.clone())?;
                    uow.append_audit(
                        actions::CREATE_TANDA,
                        Tanda::KIND.as_str(),
                        tanda.id,
                        AuditSeverity::Info,
                    );
                    Ok(tanda)
                })
            })
            .await?;

        info!(tanda_id = %tanda.id, actor = %actor, "tanda created");
        Ok(TandaSummary::from(&tanda))
    }

    /// Enrolls a user in a Draft tanda.
    ///
    /// The tanda row is rewritten too, so concurrent enrollments serialize
    /// on its version and the roster can never overfill.
    pub async fn add_participant(
        &self,
        tanda_id: TandaId,
        user_id: String,
        actor: Actor,
    ) -> Result<TandaParticipant, WorkflowError> {
        let user_id = user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(WorkflowError::validation("user id is required"));
        }

        let participant = self
            .repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let tanda = uow.get::<Tanda>(tanda_id).await?;
                    let roster = active_roster(uow, tanda_id).await?;
                    let enrolled: Vec<&str> = roster.iter().map(|p| p.user_id.as_str()).collect();

                    let turn_number = TandaService::enroll(&tanda, &enrolled, &user_id)?;
                    let participant =
                        TandaParticipant::enroll(tanda_id, user_id, turn_number, uow.now());

                    uow.insert(participant.clone())?;
                    uow.update(tanda).await?;
                    uow.append_audit(
                        actions::ADD_PARTICIPANT,
                        TandaParticipant::KIND.as_str(),
                        participant.id,
                        AuditSeverity::Info,
                    );
                    Ok(participant)
                })
            })
            .await?;

        info!(
            tanda_id = %tanda_id,
            participant_id = %participant.id,
            actor = %actor,
            "participant added"
        );
        Ok(participant)
    }

    /// Soft-deletes a participant from a Draft tanda.
    pub async fn remove_participant(
        &self,
        tanda_id: TandaId,
        participant_id: ParticipantId,
        actor: Actor,
    ) -> Result<(), WorkflowError> {
        self.repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let tanda = uow.get::<Tanda>(tanda_id).await?;
                    TandaService::ensure_draft(&tanda)?;

                    let participant = uow.get::<TandaParticipant>(participant_id).await?;
                    if participant.tanda_id != tanda_id {
                        return Err(WorkflowError::not_found(
                            TandaParticipant::KIND.as_str(),
                            participant_id,
                        ));
                    }

                    uow.delete::<TandaParticipant>(participant_id).await?;
                    uow.update(tanda).await?;
                    uow.append_audit(
                        actions::REMOVE_PARTICIPANT,
                        TandaParticipant::KIND.as_str(),
                        participant_id,
                        AuditSeverity::Warning,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(tanda_id = %tanda_id, participant_id = %participant_id, actor = %actor, "participant removed");
        Ok(())
    }

    /// Activates a Draft tanda with a full roster and draws the turn order.
    ///
    /// Returns the drawn turns in payout order.
    pub async fn activate_tanda(
        &self,
        tanda_id: TandaId,
        actor: Actor,
    ) -> Result<Vec<Turn>, WorkflowError> {
        let turns = self
            .repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let mut tanda = uow.get::<Tanda>(tanda_id).await?;
                    let roster = active_roster(uow, tanda_id).await?;

                    tanda.status = TandaService::activate(&tanda, roster.len())?;

                    let draw = TurnDraw::new(uow.now());
                    let mut turns = Vec::with_capacity(roster.len());
                    for (position, mut participant) in draw.order(&roster).into_iter().enumerate() {
                        let turn_number = u32::try_from(position + 1).unwrap_or(u32::MAX);
                        let token = draw.token(turn_number, &participant.user_id);
                        let turn = Turn::drawn(tanda_id, turn_number, &participant.user_id, token);

                        participant.turn_number = turn_number;
                        uow.update(participant).await?;
                        uow.insert(turn.clone())?;
                        turns.push(turn);
                    }

                    uow.update(tanda).await?;
                    uow.append_audit(
                        actions::ACTIVATE_TANDA,
                        Tanda::KIND.as_str(),
                        tanda_id,
                        AuditSeverity::Info,
                    );
                    Ok(turns)
                })
            })
            .await?;

        info!(tanda_id = %tanda_id, turns = turns.len(), actor = %actor, "tanda activated");
        Ok(turns)
    }

    /// Cancels a Draft or Active tanda.
    pub async fn cancel_tanda(
        &self,
        tanda_id: TandaId,
        actor: Actor,
        reason: String,
    ) -> Result<(), WorkflowError> {
        self.repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let mut tanda = uow.get::<Tanda>(tanda_id).await?;
                    tanda.status = TandaService::cancel(&tanda, &reason)?;

                    uow.update(tanda).await?;
                    uow.append_audit_with_details(
                        actions::CANCEL_TANDA,
                        Tanda::KIND.as_str(),
                        tanda_id,
                        AuditSeverity::Warning,
                        reason,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(tanda_id = %tanda_id, actor = %actor, "tanda cancelled");
        Ok(())
    }

    /// Completes an Active tanda once every turn is paid out.
    pub async fn complete_tanda(&self, tanda_id: TandaId, actor: Actor) -> Result<(), WorkflowError> {
        self.repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let mut tanda = uow.get::<Tanda>(tanda_id).await?;
                    let unpaid = uow
                        .query::<Turn, _>(Visibility::Active, |t| {
                            t.tanda_id == tanda_id && !t.is_paid_out
                        })
                        .await?
                        .len();

                    tanda.status = TandaService::complete(&tanda, unpaid)?;

                    uow.update(tanda).await?;
                    uow.append_audit(
                        actions::COMPLETE_TANDA,
                        Tanda::KIND.as_str(),
                        tanda_id,
                        AuditSeverity::Info,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(tanda_id = %tanda_id, actor = %actor, "tanda completed");
        Ok(())
    }

    /// Soft-deletes a tanda that is not Active.
    pub async fn delete_tanda(&self, tanda_id: TandaId, actor: Actor) -> Result<(), WorkflowError> {
        self.repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let tanda = uow.get::<Tanda>(tanda_id).await?;
                    TandaService::ensure_deletable(&tanda)?;

                    uow.delete::<Tanda>(tanda_id).await?;
                    uow.append_audit(
                        actions::DELETE_TANDA,
                        Tanda::KIND.as_str(),
                        tanda_id,
                        AuditSeverity::Warning,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(tanda_id = %tanda_id, actor = %actor, "tanda deleted");
        Ok(())
    }

    /// Returns a visible tanda with its roster and turns.
    pub async fn get_tanda(&self, tanda_id: TandaId) -> Result<TandaDetail, WorkflowError> {
        self.repo
            .read(move |uow| {
                Box::pin(async move {
                    let tanda = uow.get::<Tanda>(tanda_id).await?;

                    let mut participants = uow
                        .query::<TandaParticipant, _>(Visibility::Active, |p| p.tanda_id == tanda_id)
                        .await?;
                    participants.sort_by_key(|p| p.turn_number);

                    let mut turns = uow
                        .query::<Turn, _>(Visibility::Active, |t| t.tanda_id == tanda_id)
                        .await?;
                    turns.sort_by_key(|t| t.turn_number);

                    Ok(TandaDetail {
                        tanda,
                        participants,
                        turns,
                    })
                })
            })
            .await
    }

    /// Lists visible tandas with their current participant count.
    pub async fn list_tandas(&self) -> Result<Vec<TandaListItem>, WorkflowError> {
        self.list_tandas_with(Visibility::Active).await
    }

    /// Lists tandas under the given visibility. `IncludeDeleted` is meant
    /// for administrative views.
    pub async fn list_tandas_with(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<TandaListItem>, WorkflowError> {
        self.repo
            .read(move |uow| {
                Box::pin(async move {
                    let tandas = uow.query::<Tanda, _>(visibility, |_| true).await?;
                    let participants = uow
                        .query::<TandaParticipant, _>(Visibility::Active, |_| true)
                        .await?;

                    Ok(tandas
                        .into_iter()
                        .map(|tanda| TandaListItem {
                            current_participant_count: participants
                                .iter()
                                .filter(|p| p.tanda_id == tanda.id)
                                .count(),
                            id: tanda.id,
                            name: tanda.name,
                            status: tanda.status,
                            is_deleted: tanda.is_deleted,
                        })
                        .collect())
                })
            })
            .await
    }
}

/// Visible, active participants of a tanda in enrollment order.
async fn active_roster(
    uow: &mut UnitOfWork,
    tanda_id: TandaId,
) -> Result<Vec<TandaParticipant>, WorkflowError> {
    let mut roster = uow
        .query::<TandaParticipant, _>(Visibility::Active, |p| {
            p.tanda_id == tanda_id && p.status == ParticipantStatus::Active
        })
        .await?;
    roster.sort_by_key(|p| (p.turn_number, p.joined_at));
    Ok(roster)
}
