mod test_app_state;
mod test_responses;
