use std::path::Path;

use types::card::is_valid_misfortune_index;
use types::Card;

use crate::models::NewCard;
use crate::stores::Persistence;
use crate::DatabaseError;

pub fn parse_cards_yaml(yaml: &str) -> Result<Vec<NewCard>, DatabaseError> {
    let cards: Vec<NewCard> = serde_yaml::from_str(yaml)?;
    for card in &cards {
        if !is_valid_misfortune_index(card.misfortune_index) {
            return Err(DatabaseError::InvalidData(format!(
                "card {:?} has misfortune index {} outside [0, 100]",
                card.name, card.misfortune_index
            )));
        }
    }
    Ok(cards)
}

pub fn load_cards_yaml(path: impl AsRef<Path>) -> Result<Vec<NewCard>, DatabaseError> {
    let yaml = std::fs::read_to_string(path.as_ref())?;
    parse_cards_yaml(&yaml)
}

/// Inserts all cards in one transaction; either every card lands or none does.
pub async fn import_cards<P>(store: &P, cards: &[NewCard]) -> Result<Vec<Card>, DatabaseError>
where
    P: Persistence + ?Sized,
{
    let mut txn = store.begin().await?;
    let mut inserted = Vec::with_capacity(cards.len());
    for card in cards {
        if !is_valid_misfortune_index(card.misfortune_index) {
            txn.rollback().await?;
            return Err(DatabaseError::InvalidData(format!(
                "card {:?} has misfortune index {} outside [0, 100]",
                card.name, card.misfortune_index
            )));
        }
        inserted.push(txn.insert_card(card).await?);
    }
    txn.commit().await?;
    tracing::info!(count = inserted.len(), "imported catalog cards");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::InMemoryStore;

    const CARDS: &str = r#"
- name: Missed the last bus
  image_ref: /images/cards/bus.jpg
  misfortune_index: 22.5
- name: Laptop stolen
  image_ref: /images/cards/laptop.jpg
  misfortune_index: 97
"#;

    #[test]
    fn test_parse_cards_yaml() {
        let cards = parse_cards_yaml(CARDS).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].name, "Missed the last bus");
        assert_eq!(cards[1].misfortune_index, 97.0);
    }

    #[test]
    fn test_parse_rejects_out_of_range_index() {
        let yaml = "- name: Off the charts\n  image_ref: x.jpg\n  misfortune_index: 140\n";
        assert!(matches!(
            parse_cards_yaml(yaml),
            Err(DatabaseError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let mut cards = parse_cards_yaml(CARDS).unwrap();
        cards.push(NewCard {
            name: "Broken".to_string(),
            image_ref: "broken.jpg".to_string(),
            misfortune_index: -3.0,
        });

        assert!(import_cards(&store, &cards).await.is_err());
        let mut txn = store.begin().await.unwrap();
        assert_eq!(txn.count_cards().await.unwrap(), 0);
        drop(txn);

        let inserted = import_cards(&store, &cards[..2]).await.unwrap();
        assert_eq!(inserted.len(), 2);
        assert_ne!(inserted[0].id, inserted[1].id);
    }
}
