//! Slot discovery on a results page and first-match selection.
//!
//! Hours are read in priority order and slots in page order; the search
//! stops at the first slot `AcceptanceSets` accepts.

use chrono::NaiveDate;

use crate::filter::AcceptanceSets;
use crate::layout::SiteLayout;
use crate::portal::{PortalPage, WaitState};
use crate::types::{ClaimError, ClaimResult, SlotCandidate, SlotDescriptor};

/// Trim the ends and collapse every run of two or more spaces to one.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        if ch == ' ' {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// Split descriptor markup into price type and court type.
pub fn split_descriptor(markup: &str, delimiter: &str) -> Option<SlotDescriptor> {
    let mut parts = markup.split(delimiter).map(str::trim);
    let price_type = parts.next()?;
    let court_type = parts.next()?;
    if price_type.is_empty() || court_type.is_empty() {
        return None;
    }
    Some(SlotDescriptor {
        price_type: price_type.to_string(),
        court_type: court_type.to_string(),
    })
}

/// Reads slots for one location off the current results page.
pub struct SlotSearch<'a> {
    page: &'a dyn PortalPage,
    layout: &'a SiteLayout,
    date: NaiveDate,
}

impl<'a> SlotSearch<'a> {
    pub fn new(page: &'a dyn PortalPage, layout: &'a SiteLayout, date: NaiveDate) -> Self {
        Self { page, layout, date }
    }

    /// Walk `hours` in order, then slots in page order, and return the
    /// first accepted slot.
    ///
    /// Nothing past the first accepted slot is read.
    pub async fn first_match(
        &self,
        location: &str,
        hours: &[String],
        acceptance: &AcceptanceSets,
    ) -> ClaimResult<SlotCandidate> {
        for hour in hours {
            let total = self.open_hour(location, hour).await?;
            tracing::debug!(location, hour = hour.as_str(), slots = total, "Read hour");
            for index in 0..total {
                let Some(slot) = self.read_slot(location, hour, index).await? else {
                    continue;
                };
                if acceptance.matches(&slot.descriptor) {
                    return Ok(slot);
                }
            }
        }
        Err(ClaimError::NoMatch(location.to_string()))
    }

    /// Number of slots offered at `hour`, expanding its group if collapsed.
    pub async fn open_hour(&self, location: &str, hour: &str) -> ClaimResult<usize> {
        let key = self.layout.hour_slots(self.date, hour);
        if !self.page.exists(&key).await? {
            return Ok(0);
        }

        if !self.page.is_visible(&key).await? {
            self.page
                .click(&self.layout.hour_group_header(location, hour))
                .await?;
            self.page.wait_for(&key, WaitState::Visible).await?;
        }

        self.page.count(&key).await
    }

    /// The `index`-th slot at `hour`, or `None` when it cannot be read.
    pub async fn read_slot(
        &self,
        location: &str,
        hour: &str,
        index: usize,
    ) -> ClaimResult<Option<SlotCandidate>> {
        let entry = self.layout.hour_slots(self.date, hour).nth(index);
        let Some(court_id) = self
            .page
            .attribute(&entry, &self.layout.court_id_attribute)
            .await?
        else {
            tracing::warn!("Slot {entry} has no {}", self.layout.court_id_attribute);
            return Ok(None);
        };

        let button = self.layout.slot_button(self.date, hour, &court_id);
        let markup = self
            .page
            .inner_html(&self.layout.slot_descriptor(button))
            .await?;
        let Some(descriptor) = split_descriptor(&markup, &self.layout.descriptor_delimiter) else {
            tracing::debug!("Unreadable descriptor for court {court_id}: {markup:?}");
            return Ok(None);
        };
        Ok(Some(SlotCandidate {
            location: location.to_string(),
            hour: hour.to_string(),
            court_id,
            descriptor,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Paris   16e  "), "Paris 16e");
        assert_eq!(normalize_whitespace("Paris 16e"), "Paris 16e");
        assert_eq!(normalize_whitespace("   "), "");
        assert_eq!(
            normalize_whitespace("\n  Samedi 6 juin   2026  à 08h  "),
            "Samedi 6 juin 2026 à 08h"
        );
    }

    #[test]
    fn test_split_descriptor() {
        let d = split_descriptor("Tarif plein<br>Couvert", "<br>").unwrap();
        assert_eq!(d.price_type, "Tarif plein");
        assert_eq!(d.court_type, "Couvert");
    }

    #[test]
    fn test_split_descriptor_trims_markup_padding() {
        let d = split_descriptor("\n  Tarif plein <br> Découvert\n", "<br>").unwrap();
        assert_eq!(d.price_type, "Tarif plein");
        assert_eq!(d.court_type, "Découvert");
    }

    #[test]
    fn test_split_descriptor_needs_two_parts() {
        assert!(split_descriptor("Tarif plein", "<br>").is_none());
        assert!(split_descriptor("<br>Couvert", "<br>").is_none());
    }
}
