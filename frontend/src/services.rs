use client::firebase::{FirebaseAuth, RealtimeDatabase};
use client::{ClientConfig, HistoryClient, HistoryStore, PredictionClient, SessionStore};
use std::rc::Rc;

use crate::storage::BrowserStorage;
use crate::transport::GlooTransport;

pub type Auth = FirebaseAuth<GlooTransport, BrowserStorage>;
pub type Profiles = RealtimeDatabase<GlooTransport, Auth>;
pub type Sessions = SessionStore<Auth, Profiles>;
pub type History = HistoryStore<GlooTransport>;
pub type Predictions = PredictionClient<GlooTransport>;

/// Long-lived stores and clients shared by every page.
#[derive(Clone)]
pub struct Services {
    pub session: Rc<Sessions>,
    pub history: Rc<History>,
    pub prediction: Rc<Predictions>,
}

impl Services {
    pub fn new(config: &ClientConfig) -> Self {
        if let Err(e) = config.validate() {
            log::error!("Client configuration problem: {}", e);
        }

        let auth = Rc::new(FirebaseAuth::new(config, GlooTransport, BrowserStorage));
        let profiles = Rc::new(RealtimeDatabase::new(config, GlooTransport, Rc::clone(&auth)));

        Self {
            session: Rc::new(SessionStore::new(auth, profiles)),
            history: Rc::new(HistoryStore::new(HistoryClient::new(config, GlooTransport))),
            prediction: Rc::new(PredictionClient::new(config, GlooTransport)),
        }
    }
}

impl PartialEq for Services {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.session, &other.session)
            && Rc::ptr_eq(&self.history, &other.history)
            && Rc::ptr_eq(&self.prediction, &other.prediction)
    }
}
