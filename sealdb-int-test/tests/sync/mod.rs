mod rest_sync_test;
