use crate::domain::model::ServiceDescriptor;

/// 排程 Notebook 所需的 GCP 服務，順序固定（顯示與啟用請求皆依此順序）
pub const REQUIRED_SERVICES: [ServiceDescriptor; 5] = [
    ServiceDescriptor {
        name: "Cloud Storage API",
        endpoint: "storage-api.googleapis.com",
        documentation: "https://cloud.google.com/storage/",
    },
    ServiceDescriptor {
        name: "Cloud Scheduler API",
        endpoint: "cloudscheduler.googleapis.com",
        documentation: "https://cloud.google.com/scheduler",
    },
    ServiceDescriptor {
        name: "AI Platform Training API",
        endpoint: "ml.googleapis.com",
        documentation: "https://cloud.google.com/ai-platform/",
    },
    ServiceDescriptor {
        name: "Cloud Functions API",
        endpoint: "cloudfunctions.googleapis.com",
        documentation: "https://cloud.google.com/functions/",
    },
    ServiceDescriptor {
        name: "App Engine Admin API",
        endpoint: "appengine.googleapis.com",
        documentation: "https://cloud.google.com/appengine/docs/admin-api/",
    },
];
