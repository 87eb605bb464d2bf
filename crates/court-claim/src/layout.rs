//! Portal page layout: URLs, selectors, and fixed values.
//!
//! Defaults describe the Paris municipal tennis reservation site. Any
//! field can be overridden from the `layout` section of the config.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::portal::Selector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteLayout {
    // Authentication
    pub entry_url: String,
    pub login_trigger: String,
    pub username_field: String,
    pub password_field: String,
    pub login_submit: String,
    pub authenticated_marker: String,

    // Search
    pub search_url: String,
    pub location_input: String,
    pub location_suggestion: String,
    pub date_picker_trigger: String,
    pub date_picker: String,
    /// Attribute holding a `DD/MM/YYYY` date on date-picker cells.
    pub date_cell_attribute: String,
    pub search_submit: String,

    // Results
    /// Attribute holding `YYYY/MM/DD H:00:00` on slot buttons.
    pub slot_attribute: String,
    pub court_id_attribute: String,
    /// `{location}` (spaces removed) and `{hour}` are substituted.
    pub hour_group_header: String,
    pub price_description: String,
    /// Separates price type from court type in the descriptor markup.
    pub descriptor_delimiter: String,

    // Reservation
    pub reservation_title: String,
    pub interstitial_marker: String,
    pub reservation_url: String,
    pub add_player: String,
    /// Name attribute of roster inputs; `{n}` is the 1-based player index.
    pub player_field: String,
    pub roster_submit_key: String,
    pub payment_field: String,
    pub payment_value: String,
    pub final_submit: String,
    pub confirmation_marker: String,
    pub confirmed_address: String,
    pub confirmed_date: String,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            entry_url: "https://tennis.paris.fr/tennis/jsp/site/Portal.jsp?page=tennis&view=start&full=1"
                .to_string(),
            login_trigger: "#button_suivi_inscription".to_string(),
            username_field: "#username-login".to_string(),
            password_field: "#password-login".to_string(),
            login_submit: "section button".to_string(),
            authenticated_marker: ".main-informations".to_string(),

            search_url: "https://tennis.paris.fr/tennis/jsp/site/Portal.jsp?page=recherche&view=recherche_creneau#!"
                .to_string(),
            location_input: ".tokens-input-text".to_string(),
            location_suggestion: ".tokens-suggestions-list-element".to_string(),
            date_picker_trigger: "#when".to_string(),
            date_picker: ".date-picker".to_string(),
            date_cell_attribute: "dateiso".to_string(),
            search_submit: "#rechercher".to_string(),

            slot_attribute: "datedeb".to_string(),
            court_id_attribute: "courtid".to_string(),
            hour_group_header: "#head{location}{hour}h .panel-title".to_string(),
            price_description: ".price-description".to_string(),
            descriptor_delimiter: "<br>".to_string(),

            reservation_title: "Paris | TENNIS - Reservation".to_string(),
            interstitial_marker: ".captcha".to_string(),
            reservation_url: "https://tennis.paris.fr/tennis/jsp/site/Portal.jsp?page=reservation&view=reservation_creneau"
                .to_string(),
            add_player: ".addPlayer".to_string(),
            player_field: "player{n}".to_string(),
            roster_submit_key: "Enter".to_string(),
            payment_field: "#order_select_payment_form #paymentMode".to_string(),
            payment_value: "existingTicket".to_string(),
            final_submit: "#order_select_payment_form #envoyer".to_string(),
            confirmation_marker: ".confirmReservation".to_string(),
            confirmed_address: ".address".to_string(),
            confirmed_date: ".date".to_string(),
        }
    }
}

impl SiteLayout {
    pub fn location_suggestion(&self, location: &str) -> Selector {
        Selector::css(&self.location_suggestion).with_text(location)
    }

    pub fn date_cell(&self, date: NaiveDate) -> Selector {
        Selector::css(format!(
            "[{}=\"{}\"]",
            self.date_cell_attribute,
            date.format("%d/%m/%Y")
        ))
    }

    /// Every slot button for `hour` on `date`.
    pub fn hour_slots(&self, date: NaiveDate, hour: &str) -> Selector {
        Selector::css(self.slot_key(date, hour))
    }

    pub fn hour_group_header(&self, location: &str, hour: &str) -> Selector {
        let compact: String = location.chars().filter(|c| *c != ' ').collect();
        Selector::css(
            self.hour_group_header
                .replace("{location}", &compact)
                .replace("{hour}", hour),
        )
    }

    /// The claim button of one court at `hour` on `date`.
    pub fn slot_button(&self, date: NaiveDate, hour: &str, court_id: &str) -> Selector {
        Selector::css(format!(
            "[{}=\"{}\"]{}",
            self.court_id_attribute,
            court_id,
            self.slot_key(date, hour)
        ))
    }

    /// Price/court description rendered beside a slot button.
    pub fn slot_descriptor(&self, button: Selector) -> Selector {
        Selector::css(&self.price_description).left_of(button)
    }

    /// Roster input of player `index` (0-based); `field` 0 is the last
    /// name, 1 the first name.
    pub fn player_input(&self, index: usize, field: usize) -> Selector {
        self.player_inputs(index).nth(field)
    }

    pub fn player_inputs(&self, index: usize) -> Selector {
        let name = self.player_field.replace("{n}", &(index + 1).to_string());
        Selector::css(format!("[name=\"{name}\"]"))
    }

    fn slot_key(&self, date: NaiveDate, hour: &str) -> String {
        format!(
            "[{}=\"{} {}:00:00\"]",
            self.slot_attribute,
            date.format("%Y/%m/%d"),
            hour
        )
    }
}
