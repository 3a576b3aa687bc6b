mod api_workflow;
mod queue_lifecycle;
mod rest_store;
