use crate::click::{ClickTarget, ClickUntil};
use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::locator::{Locator, Resolved};
use crate::model::{parse_amount, parse_date, parse_display_date, Contract, Transaction};

const MENU_ENTRY_PREFIX: &str = "#lienMenuTertaire";
const MENU_COUNT: u32 = 2;
const ACCOUNT_TILE_MARKER: &str = "div.account-data";
const TILE_HEADERS: &str = "ul.listeDesCartouches li div.account-data div.title h3";
const CONTRACT_HEADER: &str = "#form_liste_comptes h2 span";
const BALANCE_SPANS: &str = "#form_liste_comptes div.infos-cpt>span";
const HISTORY_TOGGLE: &str = "#voirHisto";
/// Once the history is expanded the toggle's label flips to offer the
/// e-statement view instead.
const EXPANDED_MARKER: &str = "e-relev";
const TRANSACTION_TABLE: &str = "#mouvementsTable";
const TRANSACTION_CELLS: &str = "#mouvementsTable tbody tr.row td";
/// date, label, amount, and one unused cell per rendered row.
const ROW_CELL_COUNT: usize = 4;

/// Walks the two account-category menus and every account tile under them,
/// parsing each account detail view into a [`Contract`].
pub struct ContractScraper<'a> {
    locator: &'a Locator,
    config: &'a ScraperConfig,
}

impl<'a> ContractScraper<'a> {
    pub fn new(locator: &'a Locator, config: &'a ScraperConfig) -> Self {
        Self { locator, config }
    }

    fn navigation_clicker(&self) -> ClickUntil<'a> {
        ClickUntil::new(
            self.locator,
            self.config.click_retry_interval,
            self.config.click_poll_interval,
            self.config.click_attempts,
        )
    }

    fn expand_clicker(&self) -> ClickUntil<'a> {
        ClickUntil::new(
            self.locator,
            self.config.click_retry_interval,
            self.config.click_poll_interval,
            self.config.expand_attempts,
        )
    }

    /// Visit every menu and tile in display order and return one contract
    /// per tile, menu-then-tile-index ordered.
    pub async fn scrape_all(&self) -> Result<Vec<Contract>> {
        let clicker = self.navigation_clicker();
        let mut contracts = Vec::new();
        for menu_index in 1..=MENU_COUNT {
            let menu_ref = format!("{MENU_ENTRY_PREFIX}{menu_index}");
            tracing::info!(menu = menu_index, "opening account menu");
            clicker
                .run(ClickTarget::Reference(&menu_ref), move || async move {
                    self.locator.probe(ACCOUNT_TILE_MARKER).await.is_some()
                })
                .await?;

            let tile_count = self.locator.all(TILE_HEADERS).await?.len();
            tracing::debug!(menu = menu_index, tiles = tile_count, "account tiles listed");
            for tile_index in 0..tile_count {
                // Navigation replaces the DOM under the listing, so the
                // tile handles are re-resolved fresh for every index.
                let tiles = self.locator.all(TILE_HEADERS).await?;
                let tile = tiles.get(tile_index).ok_or_else(|| {
                    Error::PageShape(format!(
                        "account tile {tile_index} missing from relisted menu {menu_index}"
                    ))
                })?;
                clicker
                    .run(ClickTarget::Resolved(tile.as_ref()), move || async move {
                        self.locator.probe(TRANSACTION_TABLE).await.is_some()
                    })
                    .await?;

                let contract = self.parse_current_contract().await?;
                tracing::info!(
                    account = %contract.account_id,
                    transactions = contract.transactions.len(),
                    "contract parsed"
                );
                contracts.push(contract);

                self.locator.one(&menu_ref).await?.click().await?;
            }
        }
        Ok(contracts)
    }

    /// Parse the account detail view currently on screen.
    async fn parse_current_contract(&self) -> Result<Contract> {
        let header = self.locator.all(CONTRACT_HEADER).await?;
        let owner = header
            .last()
            .ok_or_else(|| Error::PageShape("empty contract header".into()))?
            .text()
            .await?;
        let first_line = header
            .first()
            .ok_or_else(|| Error::PageShape("empty contract header".into()))?
            .text()
            .await?
            .replace('\n', " ");
        let kind = first_line
            .split(" N°")
            .next()
            .unwrap_or(first_line.as_str())
            .trim()
            .to_string();
        let account_id = first_line
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_string();

        let info = self.locator.all(BALANCE_SPANS).await?;
        if info.len() != 2 {
            return Err(Error::PageShape(format!(
                "expected date and amount balance lines, got {} spans",
                info.len()
            )));
        }
        let amount_date = parse_display_date(&info[0].text().await?)?;
        let amount = parse_amount(&info[1].text().await?)?;

        let transactions = self.parse_transactions().await?;
        Ok(Contract {
            owner,
            kind,
            account_id,
            amount_date,
            amount,
            transactions,
        })
    }

    /// Some accounts collapse their history behind a toggle; expanding is
    /// best effort, and an expansion that never settles leaves whatever
    /// rows are already rendered.
    async fn expand_history(&self) -> Result<()> {
        if self.locator.probe(HISTORY_TOGGLE).await.is_none() {
            return Ok(());
        }
        let outcome = self
            .expand_clicker()
            .run(ClickTarget::Reference(HISTORY_TOGGLE), move || async move {
                match self.locator.probe(HISTORY_TOGGLE).await {
                    Some(Resolved::One(toggle)) => toggle
                        .text()
                        .await
                        .map(|label| label.contains(EXPANDED_MARKER))
                        .unwrap_or(false),
                    _ => false,
                }
            })
            .await;
        match outcome {
            Ok(()) => Ok(()),
            Err(Error::LookupTimeout(_)) => {
                tracing::warn!("transaction history expansion did not settle");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn parse_transactions(&self) -> Result<Vec<Transaction>> {
        self.expand_history().await?;

        let cells = match self
            .locator
            .resolve(TRANSACTION_CELLS, self.config.history_timeout)
            .await
        {
            Ok(Resolved::Many(cells)) => cells,
            Ok(Resolved::One(_)) => {
                return Err(Error::PageShape(
                    "transaction cells resolved as a single element".into(),
                ))
            }
            Err(Error::LookupTimeout(_)) => {
                tracing::debug!("no transaction rows rendered");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut texts = Vec::with_capacity(cells.len());
        for cell in &cells {
            texts.push(cell.text().await?);
        }
        if texts.len() % ROW_CELL_COUNT != 0 {
            return Err(Error::PageShape(format!(
                "{} transaction cells do not group into rows of {ROW_CELL_COUNT}",
                texts.len()
            )));
        }

        let mut transactions = Vec::with_capacity(texts.len() / ROW_CELL_COUNT);
        for row in texts.chunks(ROW_CELL_COUNT) {
            transactions.push(Transaction {
                date: parse_date(&row[0])?,
                label: row[1].clone(),
                amount: parse_amount(&row[2])?,
            });
        }
        Ok(transactions)
    }
}
