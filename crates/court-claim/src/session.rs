//! One acquisition attempt: authenticate, search locations, claim, confirm.
//!
//! An attempt owns one portal page from open to close. Every stage returns
//! a `ClaimResult`; errors that only rule out a location move on to the
//! next one, everything else ends the attempt as `AttemptOutcome::Error`
//! after a diagnostic snapshot. The page is closed on every path.

use crate::context::RunContext;
use crate::layout::SiteLayout;
use crate::portal::{ElementMutation, PortalDriver, PortalPage, Selector, WaitState};
use crate::search::{normalize_whitespace, SlotSearch};
use crate::types::{AttemptOutcome, ClaimError, ClaimResult, Reservation, SlotCandidate};

/// Drives one attempt against an open portal page.
pub struct AcquisitionSession<'a> {
    ctx: &'a RunContext,
    page: Box<dyn PortalPage>,
}

impl<'a> AcquisitionSession<'a> {
    pub fn new(ctx: &'a RunContext, page: Box<dyn PortalPage>) -> Self {
        Self { ctx, page }
    }

    /// Open a page, run one attempt, and release the page.
    ///
    /// Only a failure to open the page is returned as `Err`; everything
    /// after that is folded into the outcome.
    pub async fn attempt(ctx: &RunContext, driver: &dyn PortalDriver) -> ClaimResult<AttemptOutcome> {
        tracing::info!("Starting attempt");
        let page = driver.open_page().await?;
        tracing::info!("Portal page opened");
        Ok(AcquisitionSession::new(ctx, page).run().await)
    }

    /// Run every stage and close the page.
    pub async fn run(mut self) -> AttemptOutcome {
        let outcome = match self.authenticate().await {
            Err(e) => {
                tracing::error!("{e}");
                AttemptOutcome::Error {
                    detail: e.to_string(),
                }
            }
            Ok(()) => match self.search_locations().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Attempt failed: {e:?}");
                    self.capture_snapshot().await;
                    AttemptOutcome::Error {
                        detail: e.to_string(),
                    }
                }
            },
        };

        if let Err(e) = self.page.close().await {
            tracing::warn!("Failed to close portal page: {e}");
        }
        outcome
    }

    fn layout(&self) -> &'a SiteLayout {
        &self.ctx.config.layout
    }

    async fn authenticate(&mut self) -> ClaimResult<()> {
        let ctx = self.ctx;
        let layout = &ctx.config.layout;
        let account = &ctx.config.account;
        let page = &mut self.page;
        let login = async {
            page.goto(&layout.entry_url).await?;
            let popup = page
                .click_for_popup(&Selector::css(&layout.login_trigger))
                .await?;
            popup.wait_for_load().await?;
            popup
                .fill(&Selector::css(&layout.username_field), &account.email)
                .await?;
            popup
                .fill(&Selector::css(&layout.password_field), &account.password)
                .await?;
            popup.click(&Selector::css(&layout.login_submit)).await?;
            page.wait_for(
                &Selector::css(&layout.authenticated_marker),
                WaitState::Visible,
            )
            .await
        };
        login
            .await
            .map_err(|e| ClaimError::Authentication(e.to_string()))?;
        tracing::info!("User connected");
        Ok(())
    }

    async fn search_locations(&mut self) -> ClaimResult<AttemptOutcome> {
        let ctx = self.ctx;
        let locations = &ctx.config.locations;
        let mut misses = Vec::with_capacity(locations.len());

        for location in locations {
            tracing::info!("Search at {location}");
            match self.try_location(location).await {
                Ok(reservation) => return Ok(AttemptOutcome::Success(reservation)),
                Err(e) if e.is_location_miss() => {
                    tracing::info!("Failed to find reservation for {location}: {e}");
                    misses.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(AttemptOutcome::NoMatch {
            detail: misses.join("; "),
        })
    }

    async fn try_location(&mut self, location: &str) -> ClaimResult<Reservation> {
        self.open_results(location).await?;
        let candidate = SlotSearch::new(self.page.as_ref(), self.layout(), self.ctx.target_date)
            .first_match(location, &self.ctx.config.hours, &self.ctx.acceptance)
            .await?;
        tracing::info!(
            location,
            hour = candidate.hour.as_str(),
            court = candidate.court_id.as_str(),
            "Claiming {} / {}",
            candidate.descriptor.price_type,
            candidate.descriptor.court_type
        );
        self.claim(&candidate).await?;
        self.verify_reservation_page().await?;
        self.skip_interstitial().await?;
        self.enter_roster().await?;
        self.select_payment().await?;
        self.submit_order().await?;
        self.read_confirmation(&candidate).await
    }

    async fn open_results(&mut self, location: &str) -> ClaimResult<()> {
        let layout = self.layout();
        self.page.goto(&layout.search_url).await?;

        self.page
            .type_text(&Selector::css(&layout.location_input), location)
            .await?;
        let suggestion = layout.location_suggestion(location);
        self.page.wait_for(&suggestion, WaitState::Visible).await?;
        self.page.click(&suggestion).await?;

        self.page
            .click(&Selector::css(&layout.date_picker_trigger))
            .await?;
        let cell = layout.date_cell(self.ctx.target_date);
        self.page.wait_for(&cell, WaitState::Visible).await?;
        self.page.click(&cell).await?;
        self.page
            .wait_for(&Selector::css(&layout.date_picker), WaitState::Hidden)
            .await?;

        self.page.click(&Selector::css(&layout.search_submit)).await?;
        self.page.wait_for_load().await?;
        tracing::debug!("Results loaded for {location}");
        Ok(())
    }

    async fn claim(&self, candidate: &SlotCandidate) -> ClaimResult<()> {
        let button =
            self.layout()
                .slot_button(self.ctx.target_date, &candidate.hour, &candidate.court_id);
        self.page.click(&button).await
    }

    /// The only signal that a claim took is the reservation page title.
    async fn verify_reservation_page(&self) -> ClaimResult<()> {
        self.page.wait_for_load().await?;
        let title = self.page.title().await?;
        let expected = &self.layout().reservation_title;
        if title != *expected {
            return Err(ClaimError::Validation(format!(
                "page title {title:?}, expected {expected:?}"
            )));
        }
        Ok(())
    }

    async fn skip_interstitial(&mut self) -> ClaimResult<()> {
        let layout = self.layout();
        if self
            .page
            .exists(&Selector::css(&layout.interstitial_marker))
            .await?
        {
            tracing::info!("Interstitial detected, reloading reservation page");
            self.page.goto(&layout.reservation_url).await?;
            self.page.wait_for_load().await?;
        }
        Ok(())
    }

    async fn enter_roster(&self) -> ClaimResult<()> {
        let layout = self.layout();
        let players = &self.ctx.config.players;
        tracing::debug!("Entering {} players", players.len());
        for (i, player) in players.iter().enumerate() {
            if i > 0 {
                self.page.click(&Selector::css(&layout.add_player)).await?;
            }
            self.page
                .wait_for(&layout.player_inputs(i), WaitState::Visible)
                .await?;
            self.page
                .fill(&layout.player_input(i, 0), &player.last_name)
                .await?;
            self.page
                .fill(&layout.player_input(i, 1), &player.first_name)
                .await?;
            tracing::debug!("Player {} set: {} {}", i + 1, player.first_name, player.last_name);
        }
        self.page.press_key(&layout.roster_submit_key).await
    }

    /// The payment field is read-only and hidden; unlock it before filling.
    async fn select_payment(&self) -> ClaimResult<()> {
        let layout = self.layout();
        let field = Selector::css(&layout.payment_field);
        self.page.wait_for(&field, WaitState::Attached).await?;
        self.page
            .mutate(
                &field,
                &[
                    ElementMutation::RemoveAttribute {
                        name: "readonly".to_string(),
                    },
                    ElementMutation::SetStyle {
                        property: "display".to_string(),
                        value: "block".to_string(),
                    },
                ],
            )
            .await?;
        self.page.fill(&field, &layout.payment_value).await
    }

    async fn submit_order(&self) -> ClaimResult<()> {
        let submit = Selector::css(&self.layout().final_submit);
        self.page
            .mutate(
                &submit,
                &[ElementMutation::RemoveClass {
                    class: "hide".to_string(),
                }],
            )
            .await?;
        self.page.click(&submit).await
    }

    async fn read_confirmation(&self, candidate: &SlotCandidate) -> ClaimResult<Reservation> {
        let layout = self.layout();
        self.page
            .wait_for(
                &Selector::css(&layout.confirmation_marker),
                WaitState::Visible,
            )
            .await?;
        let address = normalize_whitespace(
            &self
                .page
                .text_content(&Selector::css(&layout.confirmed_address))
                .await?,
        );
        let when = normalize_whitespace(
            &self
                .page
                .text_content(&Selector::css(&layout.confirmed_date))
                .await?,
        );
        tracing::info!("Reservation made: {address}");
        tracing::info!("For {when}");
        Ok(Reservation {
            location: candidate.location.clone(),
            hour: candidate.hour.clone(),
            court_id: candidate.court_id.clone(),
            address,
            when,
        })
    }

    async fn capture_snapshot(&self) {
        let path = &self.ctx.config.snapshot_path;
        match self.page.snapshot(path).await {
            Ok(()) => tracing::info!("Saved snapshot to {}", path.display()),
            Err(e) => tracing::warn!("Failed to save snapshot: {e}"),
        }
    }
}
