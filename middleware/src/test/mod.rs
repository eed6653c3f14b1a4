mod logging_auth_test;
