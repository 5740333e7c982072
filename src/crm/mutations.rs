use log::debug;

use crate::crm::conversation::{Conversation, ConversationPatch, ConversationStatus};
use crate::crm::entity::{Record, Schema};
use crate::crm::integration::{Integration, BRAND_ID};
use crate::crm::manager::EntityManager;
use crate::crm::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
}

/// Who is calling. Every mutation needs a user; reads do not.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub user: Option<User>,
}

impl Context {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user: user_id.filter(|id| !id.is_empty()).map(|id| User { id }),
        }
    }

    pub fn check_login(&self) -> Result<&User, Error> {
        self.user.as_ref().ok_or(Error::LoginRequired)
    }
}

/// Authenticated entry points. Each one checks the login before touching the store.
pub struct Mutations<'a> {
    manager: &'a EntityManager<'a>,
}

impl<'a> Mutations<'a> {
    pub const fn new(manager: &'a EntityManager<'a>) -> Self {
        Self { manager }
    }

    pub const fn manager(&self) -> &'a EntityManager<'a> {
        self.manager
    }

    pub fn add<S: Schema>(&self, context: &Context, fields: S) -> Result<Record<S>, Error> {
        let user = context.check_login()?;
        self.manager.create(fields, &user.id)
    }

    pub fn edit<S: Schema>(&self, context: &Context, id: &str, patch: &S::Patch) -> Result<Record<S>, Error> {
        context.check_login()?;
        self.manager.update::<S>(id, patch)
    }

    pub fn remove<S: Schema>(&self, context: &Context, id: &str) -> Result<Record<S>, Error> {
        context.check_login()?;
        self.manager.remove::<S>(id)
    }

    /// Attaches the given integrations to a brand.
    pub fn brands_manage_integrations(
        &self,
        context: &Context,
        brand_id: &str,
        integration_ids: &[String],
    ) -> Result<Vec<Record<Integration>>, Error> {
        context.check_login()?;
        self.manager
            .reassign_children::<Integration>(BRAND_ID, brand_id, integration_ids)
    }

    /// Sets the status, or flips it when none is given.
    pub fn conversations_change_status(
        &self,
        context: &Context,
        id: &str,
        status: Option<ConversationStatus>,
    ) -> Result<Record<Conversation>, Error> {
        context.check_login()?;

        let status = match status {
            Some(status) => status,
            None => self.manager.get_by_id_or_fail::<Conversation>(id)?.fields.status.toggled(),
        };
        debug!("Changing conversation {id} status to {status}");

        self.manager.update::<Conversation>(
            id,
            &ConversationPatch {
                status: Some(status),
                ..Default::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::crm::brand::Brand;
    use crate::crm::conversation::{Conversation, ConversationStatus};
    use crate::crm::deals::{Board, BoardPatch};
    use crate::crm::integration::{Integration, IntegrationKind};
    use crate::crm::manager::tests::SpyStore;
    use crate::crm::manager::EntityManager;
    use crate::crm::mutations::{Context, Mutations, User};
    use crate::crm::Error;
    use crate::store::memory::MemoryStore;

    fn logged_in() -> Context {
        Context::new(Some("u1".to_owned()))
    }

    fn conversation(mutations: &Mutations, status: ConversationStatus) -> String {
        let integration = mutations
            .add(
                &logged_in(),
                Integration {
                    name: "Chat".to_owned(),
                    kind: IntegrationKind::Messenger,
                    brand_id: None,
                },
            )
            .expect("Integration");

        mutations
            .add(
                &logged_in(),
                Conversation {
                    content: "Hello".to_owned(),
                    integration_id: integration.id,
                    status,
                    customer_id: None,
                },
            )
            .expect("Conversation")
            .id
    }

    #[test]
    fn test_context() {
        assert!(Context::default().check_login().is_err());
        assert!(Context::new(Some(String::new())).check_login().is_err());
        assert_eq!(
            &User { id: "u1".to_owned() },
            logged_in().check_login().expect("User")
        );
    }

    #[test]
    fn test_mutations_require_login() {
        let store = SpyStore::default();
        let manager = EntityManager::new(&store);
        let mutations = Mutations::new(&manager);
        let board = mutations
            .add(
                &logged_in(),
                Board {
                    name: "Sales".to_owned(),
                },
            )
            .expect("Board");
        let conversation_id = conversation(&mutations, ConversationStatus::Open);
        let writes = store.writes.get();
        let anonymous = Context::default();

        assert!(matches!(
            mutations.add(
                &anonymous,
                Board {
                    name: "Support".to_owned()
                }
            ),
            Err(Error::LoginRequired)
        ));
        assert!(matches!(
            mutations.edit::<Board>(
                &anonymous,
                &board.id,
                &BoardPatch {
                    name: Some("Renamed".to_owned())
                }
            ),
            Err(Error::LoginRequired)
        ));
        assert!(matches!(
            mutations.remove::<Board>(&anonymous, &board.id),
            Err(Error::LoginRequired)
        ));
        assert!(matches!(
            mutations.brands_manage_integrations(&anonymous, "b1", &["i1".to_owned()]),
            Err(Error::LoginRequired)
        ));
        assert!(matches!(
            mutations.conversations_change_status(&anonymous, &conversation_id, None),
            Err(Error::LoginRequired)
        ));
        assert!(matches!(
            mutations.add(
                &anonymous,
                Brand {
                    name: "Acme".to_owned(),
                    ..Default::default()
                }
            ),
            Err(Error::LoginRequired)
        ));

        assert_eq!(writes, store.writes.get());
        assert_eq!(0, store.deletes.get());
        assert_eq!(0, store.indexes.get());
        assert_eq!(
            "Sales",
            manager.get_by_id_or_fail::<Board>(&board.id).expect("Board").fields.name
        );
    }

    #[test]
    fn test_add_records_owner() {
        let store = MemoryStore::new();
        let manager = EntityManager::new(&store);
        let mutations = Mutations::new(&manager);

        let board = mutations
            .add(
                &Context::new(Some("owner".to_owned())),
                Board {
                    name: "Sales".to_owned(),
                },
            )
            .expect("Board");

        assert_eq!("owner", board.user_id);
    }

    #[test]
    fn test_change_status_toggles() {
        let store = MemoryStore::new();
        let manager = EntityManager::new(&store);
        let mutations = Mutations::new(&manager);
        let id = conversation(&mutations, ConversationStatus::Open);

        let closed = mutations
            .conversations_change_status(&logged_in(), &id, None)
            .expect("Toggle");
        assert_eq!(ConversationStatus::Closed, closed.fields.status);

        let reopened = mutations
            .conversations_change_status(&logged_in(), &id, None)
            .expect("Toggle");
        assert_eq!(ConversationStatus::Open, reopened.fields.status);

        let explicit = mutations
            .conversations_change_status(&logged_in(), &id, Some(ConversationStatus::Open))
            .expect("Set");
        assert_eq!(ConversationStatus::Open, explicit.fields.status);
        assert_eq!("Hello", explicit.fields.content);
    }

    #[test]
    fn test_change_status_missing_conversation() {
        let store = MemoryStore::new();
        let manager = EntityManager::new(&store);
        let mutations = Mutations::new(&manager);

        assert_eq!(
            "Conversation not found with id missing",
            mutations
                .conversations_change_status(&logged_in(), "missing", None)
                .expect_err("Missing")
                .to_string()
        );
    }

    #[test]
    fn test_brands_manage_integrations() {
        let store = MemoryStore::new();
        let manager = EntityManager::new(&store);
        let mutations = Mutations::new(&manager);
        let brand = mutations
            .add(
                &logged_in(),
                Brand {
                    name: "Acme".to_owned(),
                    ..Default::default()
                },
            )
            .expect("Brand");
        let integration = mutations
            .add(
                &logged_in(),
                Integration {
                    name: "Lead form".to_owned(),
                    kind: IntegrationKind::Form,
                    brand_id: None,
                },
            )
            .expect("Integration");

        let integrations = mutations
            .brands_manage_integrations(&logged_in(), &brand.id, &[integration.id.clone()])
            .expect("Manage");

        assert_eq!(1, integrations.len());
        assert_eq!(Some(brand.id), integrations[0].fields.brand_id.clone());
        assert_eq!(integration.id, integrations[0].id);
    }
}
